//! Service supervisor
//!
//! Runs an HTTP listener under a small supervisor that contains handler
//! faults and shuts down in order on termination signals.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────── process ─────────────────────────────────┐
//!   │                                                                          │
//!   │  main loop ──signals──▶ terminal? ──▶ close exit notification            │
//!   │     │                                        │                           │
//!   │     │ spawns                                 ▼                           │
//!   │     ├──▶ listener task ◀──── stop() ── shutdown coordinator task         │
//!   │     │        │                                                           │
//!   │     │        ▼                                                           │
//!   │     │   per-request task ─▶ recovery middleware ─▶ handler               │
//!   │     │                         (500 on fault, access/error record)        │
//!   │     │                                                                    │
//!   │     └──▶ wait for supervised tasks ─▶ flush + close log sink ─▶ exit     │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use service_supervisor::config::{self, LogFormat, ServiceConfig};
use service_supervisor::lifecycle::{startup, ExitStatus};

#[derive(Parser)]
#[command(name = "service-supervisor")]
#[command(about = "HTTP service with fault isolation and graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_format`.
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    match value {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format `{other}` (expected text or json)")),
    }
}

impl Cli {
    fn into_config(self) -> Result<ServiceConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }

        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("service-supervisor: {e}");
            return ExitStatus::StartupFailure.into();
        }
    };

    startup::launch(config).await.into()
}
