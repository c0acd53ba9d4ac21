//! Fault isolation at the request boundary.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;

use service_supervisor::http::{HttpServer, X_REQUEST_ID};

mod common;

async fn send(server: &HttpServer, request: Request<Body>) -> Response {
    server.app().clone().oneshot(request).await.unwrap()
}

async fn get(server: &HttpServer, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, "svc.test")
        .body(Body::empty())
        .unwrap();
    send(server, request).await
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn success_emits_one_access_record() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/?x=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_owned();
    assert_eq!(body_text(response).await, "it works");

    let access = logs.with_message("Request served");
    assert_eq!(access.len(), 1);
    let fields = &access[0]["fields"];
    assert_eq!(fields["method"], "GET");
    assert_eq!(fields["host"], "svc.test");
    assert_eq!(fields["uri"], "/?x=1");
    assert_eq!(fields["addr"], "-");
    assert_eq!(fields["status"], 200);
    assert_eq!(fields["request_id"], request_id.as_str());
    assert!(fields["elapsed"].is_string());
    assert!(logs.at_level("ERROR").is_empty());
}

#[tokio::test]
async fn controlled_fault_is_500_without_error_record() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/controlled").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_text(response).await, "known failure\n");

    assert!(logs.at_level("ERROR").is_empty());
    assert!(logs.with_message("Request served").is_empty());
}

#[tokio::test]
async fn panic_is_500_with_dump_and_one_error_record() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/panic").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "\"boom\"\n");

    let errors = logs.at_level("ERROR");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["fields"]["message"], "Request handler faulted");
    assert_eq!(errors[0]["fields"]["kind"], "unexpected");
    assert_eq!(errors[0]["fields"]["uri"], "/panic");
    // The hook hands the panic location to the record instead of stderr.
    let fault = errors[0]["fields"]["fault"].as_str().unwrap();
    assert!(fault.starts_with("\"boom\" at "));
    assert!(fault.contains("tests/common/mod.rs:"));
    assert!(logs.with_message("Request served").is_empty());
    assert_eq!(server.in_flight().count(), 0);
}

#[tokio::test]
async fn nil_access_panic_is_contained() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/nil").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("called `Option::unwrap()` on a `None` value"));
    assert_eq!(logs.at_level("ERROR").len(), 1);
}

#[tokio::test]
async fn unexpected_fault_value_is_dumped_and_logged() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/unexpected").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "(\"state\", 7)\n");
    assert_eq!(logs.at_level("ERROR").len(), 1);
}

#[tokio::test]
async fn demo_endpoint_never_logs_errors() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/api/hello").await;
    let status = response.status();
    let body = body_text(response).await;
    match status {
        StatusCode::OK => {
            assert_eq!(body, "/hello");
            assert_eq!(logs.with_message("Request served").len(), 1);
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            assert_eq!(body, "1\n");
            assert!(logs.with_message("Request served").is_empty());
        }
        other => panic!("unexpected status {other}"),
    }
    assert!(logs.at_level("ERROR").is_empty());
}

#[tokio::test]
async fn unmatched_path_is_404_and_logged_as_access() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let response = get(&server, "/no/such/route").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 page not found\n");
    let access = logs.with_message("Request served");
    assert_eq!(access.len(), 1);
    assert_eq!(access[0]["fields"]["status"], 404);
}

#[tokio::test]
async fn every_request_has_exactly_one_outcome() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let paths = ["/", "/controlled", "/panic", "/unexpected", "/api/hello1?a=b"];
    let requests = (0..20).map(|i| get(&server, paths[i % paths.len()]));
    let responses = futures_util::future::join_all(requests).await;

    let ok = responses.iter().filter(|r| r.status() == StatusCode::OK).count();
    let faulted = responses
        .iter()
        .filter(|r| r.status() == StatusCode::INTERNAL_SERVER_ERROR)
        .count();
    assert_eq!(ok, 8);
    assert_eq!(faulted, 12);

    // Access records for successes only, error records for unexpected faults only.
    assert_eq!(logs.with_message("Request served").len(), 8);
    assert_eq!(logs.at_level("ERROR").len(), 8);
    assert_eq!(server.in_flight().count(), 0);
}

#[tokio::test]
async fn echo_endpoints() {
    let server = common::test_server();

    let response = get(&server, "/api/hello1?b=2&a=1").await;
    assert_eq!(body_text(response).await, "a=1&b=2");

    let request = Request::builder()
        .method("POST")
        .uri("/api/hello2")
        .body(Body::from("raw text body"))
        .unwrap();
    assert_eq!(body_text(send(&server, request).await).await, "raw text body");

    let request = Request::builder()
        .method("POST")
        .uri("/api/hello3")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("field-name=value+one"))
        .unwrap();
    assert_eq!(body_text(send(&server, request).await).await, "value one");

    let request = Request::builder()
        .method("POST")
        .uri("/api/hello4")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("content=hi"))
        .unwrap();
    assert_eq!(body_text(send(&server, request).await).await, "hi");
}

#[tokio::test]
async fn missing_upload_is_controlled_fault() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());
    let server = common::test_server();

    let request = Request::builder()
        .method("POST")
        .uri("/api/hello5")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "no such file\n");
    assert!(logs.at_level("ERROR").is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected_before_the_handler() {
    let mut config = common::test_config();
    config.listener.max_body_bytes = 8;
    let routes = common::test_routes(&config);
    let server = HttpServer::new(config.listener, routes);

    let request = Request::builder()
        .method("POST")
        .uri("/api/hello2")
        .header(header::CONTENT_LENGTH, "32")
        .body(Body::from("0123456789abcdef0123456789abcdef"))
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn oversized_chunked_body_is_rejected_not_faulted() {
    let (sink, logs) = common::capture_logs();
    let _guard = tracing::dispatcher::set_default(sink.dispatch());

    let mut config = common::test_config();
    config.listener.max_body_bytes = 8;
    let routes = common::test_routes(&config);
    let server = HttpServer::new(config.listener, routes);

    // No Content-Length, so the limit is only hit while the body streams in.
    for uri in ["/api/hello2", "/api/hello4"] {
        let chunks = vec![
            Ok::<_, std::io::Error>("content=01"),
            Ok("23456789ab"),
            Ok("cdefgh"),
        ];
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();
        let response = send(&server, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE, "{uri}");
    }

    assert!(logs.at_level("ERROR").is_empty());
    let access = logs.with_message("Request served");
    assert_eq!(access.len(), 2);
    assert!(access.iter().all(|record| record["fields"]["status"] == 413));
}

#[tokio::test]
async fn static_files_and_diagnostics() {
    let server = common::test_server();

    let response = get(&server, "/static/Cargo.toml").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("[package]"));

    let response = get(&server, "/debug/pprof/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let index: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(index["pid"], std::process::id());
    assert_eq!(index["endpoints"][0], "/debug/pprof/cmdline");

    let response = get(&server, "/debug/pprof/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
