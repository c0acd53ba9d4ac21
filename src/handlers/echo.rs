//! Echo endpoints.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::Request;

use crate::handlers::form::{Form, FormError};

/// `/api/hello1`: the whole form, re-encoded.
pub async fn form_echo(request: Request) -> Result<String, FormError> {
    Ok(Form::read(request).await?.encode())
}

/// `/api/hello2`: the raw body.
pub async fn body_echo(body: Result<Bytes, BytesRejection>) -> Result<Bytes, FormError> {
    Ok(body?)
}

/// `/api/hello3`: the `field-name` field.
pub async fn field_name(request: Request) -> Result<String, FormError> {
    Ok(Form::read(request).await?.value("field-name").to_owned())
}

/// `/api/hello4`: the `content` field.
pub async fn content(request: Request) -> Result<String, FormError> {
    Ok(Form::read(request).await?.value("content").to_owned())
}

/// `/api/hello5`: the uploaded `field-name` file.
pub async fn file_echo(request: Request) -> Result<Bytes, FormError> {
    let form = Form::read(request).await?;
    form.file("field-name").cloned().ok_or(FormError::NoSuchFile)
}
