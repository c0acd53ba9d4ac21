//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, address parses)
//! - Check the log filter is usable before the sink is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("static_files.root must not be empty")]
    EmptyStaticRoot,

    #[error("static_files.prefix `{0}` must start with `/` and name a sub-path")]
    StaticPrefix(String),

    #[error("observability.log_level `{0}` is not a valid filter directive")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(listener.bind_address.clone()));
    }
    if listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let static_files = &config.static_files;
    if static_files.enabled {
        if static_files.root.trim().is_empty() {
            errors.push(ValidationError::EmptyStaticRoot);
        }
        let prefix = static_files.prefix.as_str();
        if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
            errors.push(ValidationError::StaticPrefix(prefix.to_string()));
        }
    }

    let level = &config.observability.log_level;
    if EnvFilter::try_new(level).is_err() {
        errors.push(ValidationError::LogLevel(level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
