//! Request handlers served by the supervised listener.
//!
//! These are thin collaborators: an acknowledgement at `/`, a demo endpoint
//! that alternates between success and a controlled fault, echo endpoints,
//! diagnostics under `/debug/pprof/` and static files.

pub mod debug;
pub mod demo;
pub mod echo;
pub mod form;

use axum::http::StatusCode;
use axum::routing::any;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::services::ServeDir;

use crate::config::ServiceConfig;

/// Build the application routes. Middleware is added by the listener.
pub fn routes(config: &ServiceConfig, metrics: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/", any(root))
        .route("/api/hello", any(demo::hello))
        .route("/api/hello1", any(echo::form_echo))
        .route("/api/hello2", any(echo::body_echo))
        .route("/api/hello3", any(echo::field_name))
        .route("/api/hello4", any(echo::content))
        .route("/api/hello5", any(echo::file_echo))
        .fallback(not_found);

    if config.observability.profiling_enabled {
        router = router.merge(debug::router(metrics));
    }

    let static_files = &config.static_files;
    if static_files.enabled {
        let prefix = static_files.prefix.trim_end_matches('/');
        tracing::debug!(prefix, root = %static_files.root, "Serving static files");
        router = router.nest_service(prefix, ServeDir::new(&static_files.root));
    }

    router
}

async fn root() -> &'static str {
    "it works"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
