//! Structured logging.
//!
//! # Responsibilities
//! - Build the `tracing` dispatcher from the observability config
//! - Own the output stream records are written to
//! - Flush and close that stream exactly once at process end
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, text format for development
//! - Log level configurable via config and `RUST_LOG`
//! - Output is line-buffered; `close` consumes the sink so it cannot run twice

use std::io::{self, IsTerminal, LineWriter, Write};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, ObservabilityConfig};

/// Error type for logging initialisation.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter `{directive}`: {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global log subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

type Output = LineWriter<Box<dyn Write + Send>>;

/// Shared handle to the sink's output. Writes after close are discarded.
#[derive(Clone)]
struct SinkWriter {
    out: Arc<Mutex<Option<Output>>>,
}

impl SinkWriter {
    fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(Some(LineWriter::new(out)))),
        }
    }

    fn take(&self) -> Option<Output> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.out.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(out) => out.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // One lock per record keeps concurrent lines whole.
        match self.out.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(out) => out.write_all(buf),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.out.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// The process-wide logging sink.
///
/// Created once at startup, handed to the supervisor, and closed by it after
/// every supervised task has finished.
pub struct LogSink {
    dispatch: Dispatch,
    writer: SinkWriter,
}

impl LogSink {
    /// Sink writing to stdout. `RUST_LOG` takes precedence over the
    /// configured level.
    pub fn stdout(config: &ObservabilityConfig) -> Result<Self, LogError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => config_filter(config)?,
        };
        let ansi = io::stdout().is_terminal();
        Ok(Self::build(config.log_format, filter, Box::new(io::stdout()), ansi))
    }

    /// Sink writing to an arbitrary stream, filtered by the configured level only.
    pub fn with_writer<W>(config: &ObservabilityConfig, out: W) -> Result<Self, LogError>
    where
        W: Write + Send + 'static,
    {
        let filter = config_filter(config)?;
        Ok(Self::build(config.log_format, filter, Box::new(out), false))
    }

    fn build(format: LogFormat, filter: EnvFilter, out: Box<dyn Write + Send>, ansi: bool) -> Self {
        let writer = SinkWriter::new(out);
        let layer = match format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer.clone())
                .with_filter(filter)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_ansi(ansi)
                .with_writer(writer.clone())
                .with_filter(filter)
                .boxed(),
        };
        let dispatch = Dispatch::new(Registry::default().with(layer));

        Self { dispatch, writer }
    }

    /// The dispatcher records are emitted through.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Make this sink the global default for every thread.
    pub fn install(&self) -> Result<(), LogError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }

    /// Flush buffered output and detach the stream.
    pub fn close(self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

fn config_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(&config.log_level).map_err(|source| LogError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}
