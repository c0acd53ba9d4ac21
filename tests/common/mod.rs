//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use serde_json::Value;

use service_supervisor::config::{ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig};
use service_supervisor::handlers;
use service_supervisor::http::{Fault, HttpServer};
use service_supervisor::observability::install_panic_hook;
use service_supervisor::LogSink;

/// In-memory log output, one JSON record per line.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is JSON"))
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["level"] == level)
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["fields"]["message"] == message)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A JSON log sink limited to this crate's records, plus its captured output.
pub fn capture_logs() -> (LogSink, CapturedLogs) {
    let logs = CapturedLogs::default();
    let config = ObservabilityConfig {
        log_level: "service_supervisor=info".into(),
        log_format: LogFormat::Json,
        ..ObservabilityConfig::default()
    };
    let sink = LogSink::with_writer(&config, logs.clone()).unwrap();
    (sink, logs)
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        ..ListenerConfig::default()
    };
    config.observability.metrics_enabled = false;
    config
}

/// Application routes plus a few endpoints that misbehave on purpose.
///
/// Installs the service's panic hook, so caught panics stay off stderr.
pub fn test_routes(config: &ServiceConfig) -> Router {
    install_panic_hook();
    handlers::routes(config, None)
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                "slow done"
            }),
        )
        .route("/panic", get(panic_handler))
        .route("/nil", get(nil_handler))
        .route("/controlled", get(controlled_handler))
        .route("/unexpected", get(unexpected_handler))
}

pub fn test_server() -> HttpServer {
    let config = test_config();
    let routes = test_routes(&config);
    HttpServer::new(config.listener, routes)
}

async fn panic_handler() -> &'static str {
    panic!("boom")
}

async fn nil_handler() -> String {
    let missing: Option<String> = None;
    missing.unwrap()
}

async fn controlled_handler() -> Result<&'static str, Fault> {
    Err(Fault::controlled("known failure"))
}

async fn unexpected_handler() -> Result<&'static str, Fault> {
    Err(Fault::unexpected_value(("state", 7)))
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
