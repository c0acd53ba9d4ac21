//! Form decoding shared by the echo endpoints.
//!
//! Collects fields from the url-encoded or multipart body followed by the
//! query string, and files from multipart bodies.
//!
//! Bodies are buffered through axum's extractors so an overflow of the
//! listener's body limit stays a 413 instead of becoming a fault.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::fault::Fault;

const URL_ENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Failure reading a request body or form.
///
/// Body-limit overflows answer 413; everything else is a controlled fault.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Multipart(#[from] MultipartRejection),

    #[error(transparent)]
    Field(#[from] MultipartError),

    #[error("no such file")]
    NoSuchFile,
}

impl FormError {
    pub fn status(&self) -> StatusCode {
        match self {
            FormError::Body(rejection) => rejection.status(),
            FormError::Multipart(rejection) => rejection.status(),
            FormError::Field(err) => err.status(),
            FormError::NoSuchFile => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()).into_response()
            }
            _ => Fault::controlled(self).into_response(),
        }
    }
}

/// Decoded request form.
#[derive(Debug, Default)]
pub struct Form {
    values: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, Bytes>,
}

impl Form {
    /// Decode the body (if it is a form) and the query string.
    pub async fn read(request: Request) -> Result<Self, FormError> {
        let mut form = Form::default();
        let query = request.uri().query().map(str::to_owned);
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with(URL_ENCODED) {
            let body = Bytes::from_request(request, &()).await?;
            form.extend_encoded(&body);
        } else if content_type.starts_with(MULTIPART) {
            let mut multipart = Multipart::from_request(request, &()).await?;
            while let Some(field) = multipart.next_field().await? {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                if field.file_name().is_some() {
                    form.files.insert(name, field.bytes().await?);
                } else {
                    let text = field.text().await?;
                    form.values.entry(name).or_default().push(text);
                }
            }
        }

        if let Some(query) = query {
            form.extend_encoded(query.as_bytes());
        }

        Ok(form)
    }

    fn extend_encoded(&mut self, input: &[u8]) {
        for (name, value) in url::form_urlencoded::parse(input) {
            self.values
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }

    /// First value of a field, or the empty string.
    pub fn value(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Contents of an uploaded file field.
    pub fn file(&self, name: &str) -> Option<&Bytes> {
        self.files.get(name)
    }

    /// Re-encode every field as `application/x-www-form-urlencoded`, sorted by name.
    pub fn encode(&self) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.values {
            for value in values {
                out.append_pair(name, value);
            }
        }
        out.finish()
    }
}
