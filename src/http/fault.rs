//! Request-level fault taxonomy.
//!
//! Handlers return `Result<_, Fault>`. A [`Fault`] is either *controlled*
//! (raised on purpose to report a known error condition) or *unexpected*.
//! Panics caught at the recovery boundary are always unexpected.
//!
//! Any `std::error::Error` converts into a controlled fault, so `?` inside a
//! handler reports I/O and parse failures without an error-level log entry.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::observability::panics;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Whether a fault was raised on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Deliberate, known error condition. Never logged at error level.
    Controlled,
    /// Anything else, including panics. Always logged at error level.
    Unexpected,
}

impl FaultKind {
    /// Short stable label for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FaultKind::Controlled => "controlled",
            FaultKind::Unexpected => "unexpected",
        }
    }
}

/// What a fault carries.
pub enum FaultPayload {
    /// An error value; its description becomes the response body.
    Error(BoxError),
    /// A textual dump of an arbitrary value.
    Value(String),
}

/// A failure raised by a request handler.
pub struct Fault {
    kind: FaultKind,
    payload: FaultPayload,
    /// Source location of a caught panic.
    location: Option<String>,
}

impl Fault {
    /// A controlled fault carrying an error.
    pub fn controlled(err: impl Into<BoxError>) -> Self {
        Self {
            kind: FaultKind::Controlled,
            payload: FaultPayload::Error(err.into()),
            location: None,
        }
    }

    /// An unexpected fault carrying an error.
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Self {
            kind: FaultKind::Unexpected,
            payload: FaultPayload::Error(err.into()),
            location: None,
        }
    }

    /// A controlled fault carrying an arbitrary value.
    pub fn controlled_value<T: fmt::Debug>(value: T) -> Self {
        Self {
            kind: FaultKind::Controlled,
            payload: FaultPayload::Value(format!("{value:?}")),
            location: None,
        }
    }

    /// An unexpected fault carrying an arbitrary value.
    pub fn unexpected_value<T: fmt::Debug>(value: T) -> Self {
        Self {
            kind: FaultKind::Unexpected,
            payload: FaultPayload::Value(format!("{value:?}")),
            location: None,
        }
    }

    /// Classify a payload caught from an unwinding panic.
    ///
    /// Boxed errors keep their description. Strings and common primitives are
    /// dumped in debug form; anything else cannot be inspected and is reported
    /// by type only. The panic location, when the hook recorded one, goes to
    /// the log detail.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let location = panics::take_location();
        let payload = match payload.downcast::<BoxError>() {
            Ok(err) => FaultPayload::Error(*err),
            Err(payload) => FaultPayload::Value(dump_panic(payload.as_ref())),
        };

        Self {
            kind: FaultKind::Unexpected,
            payload,
            location,
        }
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn payload(&self) -> &FaultPayload {
        &self.payload
    }

    pub fn is_controlled(&self) -> bool {
        self.kind == FaultKind::Controlled
    }

    /// Snapshot the fault for the response and the log.
    pub fn record(&self) -> FaultRecord {
        let (message, detail) = match &self.payload {
            FaultPayload::Error(err) => (err.to_string(), format!("{err:?}")),
            FaultPayload::Value(dump) => (dump.clone(), dump.clone()),
        };
        let detail = match &self.location {
            Some(location) => format!("{detail} at {location}"),
            None => detail,
        };
        FaultRecord {
            kind: self.kind,
            message,
            detail,
        }
    }
}

fn dump_panic(payload: &(dyn Any + Send)) -> String {
    macro_rules! dump_as {
        ($($ty:ty),*) => {
            $(
                if let Some(value) = payload.downcast_ref::<$ty>() {
                    return format!("{value:?}");
                }
            )*
        };
    }

    dump_as!(&'static str, String, i32, i64, u32, u64, usize, bool);
    "Box<dyn Any + Send>".to_string()
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Fault::controlled(err)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Fault");
        out.field("kind", &self.kind);
        match &self.payload {
            FaultPayload::Error(err) => out.field("error", err),
            FaultPayload::Value(dump) => out.field("value", dump),
        };
        out.finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            FaultPayload::Error(err) => write!(f, "{err}"),
            FaultPayload::Value(dump) => f.write_str(dump),
        }
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        self.record().into_response()
    }
}

/// A recovered fault, consumed once to produce a response and a log entry.
///
/// The response built from a record carries the record as an extension so
/// the recovery middleware can tell a faulted request from a normal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRecord {
    pub kind: FaultKind,
    /// Response body: the error description or the value dump.
    pub message: String,
    /// Debug rendering of the payload, for the log.
    pub detail: String,
}

impl IntoResponse for FaultRecord {
    fn into_response(self) -> Response {
        let body = format!("{}\n", self.message);
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response.extensions_mut().insert(self);
        response
    }
}
