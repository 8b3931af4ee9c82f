//! JSON endpoint ingestion against a local HTTP stub.
//!
//! This test suite covers:
//! - Arrays of flat objects audited end to end
//! - Non-array payloads rejected as `ShapeError`
//! - HTTP failures and unreachable hosts as `FetchError`
//! - Response size caps
//! - Deadline enforcement, explicit and configured

use chrono::{TimeZone, Utc};
use dqs_core::{
    AuditConfig, AuditEngine, Dimension, EndpointSource, IngestConfig, SourceDescriptor,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Reads one request head and returns the raw text.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = stream.read(&mut buffer).await.unwrap();
        if read == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..read]);
    }
    String::from_utf8_lossy(&request).into_owned()
}

/// Serves a single canned response, returning the server address and a
/// handle yielding the request it received.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    });
    (addr, handle)
}

fn engine() -> AuditEngine {
    AuditEngine::new(
        AuditConfig::default()
            .with_reference_time(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_endpoint_array_is_audited() {
    let body = r#"[
        {"customer_id": "C1", "amount": 10.5, "currency": "INR"},
        {"customer_id": "C2", "amount": 20.0, "currency": "INR"},
        {"customer_id": null, "amount": 7.25, "currency": "inr"},
        {"customer_id": "C4", "currency": "INR"}
    ]"#;
    let (addr, server) = serve_once("200 OK", body).await;

    let source = SourceDescriptor::from(
        EndpointSource::new(format!("http://{}/transactions", addr))
            .with_header("X-Audit-Token", "abc123"),
    );
    let report = engine().analyze(&source).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /transactions"));
    assert!(request.to_ascii_lowercase().contains("x-audit-token: abc123"));

    let scores = report.dimension_scores();
    assert!((scores[&Dimension::Completeness] - 0.75).abs() < 1e-9);
    assert!(scores[&Dimension::Consistency] < 0.9);

    let completeness = &report.issues()[&Dimension::Completeness];
    assert_eq!(
        completeness.affected_columns,
        vec!["customer_id".to_string(), "amount".to_string()]
    );
}

#[tokio::test]
async fn test_endpoint_object_payload_is_shape_error() {
    let (addr, _server) = serve_once("200 OK", r#"{"data": []}"#).await;
    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));

    let error = engine().analyze(&source).await.unwrap_err();
    assert_eq!(error.kind(), "ShapeError");
}

#[tokio::test]
async fn test_endpoint_invalid_json_is_shape_error() {
    let (addr, _server) = serve_once("200 OK", "not json").await;
    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));

    let error = engine().analyze(&source).await.unwrap_err();
    assert_eq!(error.kind(), "ShapeError");
}

#[tokio::test]
async fn test_endpoint_http_error_is_fetch_error() {
    let (addr, _server) = serve_once("503 Service Unavailable", "[]").await;
    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));

    let error = engine().analyze(&source).await.unwrap_err();
    assert_eq!(error.kind(), "FetchError");
    assert!(error.to_string().contains("503"));
}

#[tokio::test]
async fn test_endpoint_unreachable_is_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));
    let error = engine().analyze(&source).await.unwrap_err();
    assert_eq!(error.kind(), "FetchError");
}

#[tokio::test]
async fn test_endpoint_unsupported_scheme_is_fetch_error() {
    let source = SourceDescriptor::from(EndpointSource::new("ftp://example.invalid/data.json"));
    let error = engine().analyze(&source).await.unwrap_err();
    assert_eq!(error.kind(), "FetchError");
}

#[tokio::test]
async fn test_endpoint_deadline_is_timeout_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request = read_request(&mut stream).await;
        // Hold the connection open without answering.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));
    let error = engine()
        .analyze_with_deadline(&source, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), "TimeoutError");
}

#[tokio::test]
async fn test_endpoint_body_over_cap_is_fetch_error() {
    let body = r#"[{"customer_id": "C1", "amount": 10.5}, {"customer_id": "C2", "amount": 20.0}]"#;
    let (addr, _server) = serve_once("200 OK", body).await;
    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));

    let config = AuditConfig::default()
        .with_ingest(IngestConfig::new().with_max_response_bytes(16));
    let error = AuditEngine::new(config)
        .unwrap()
        .analyze(&source)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), "FetchError");
    assert!(error.to_string().contains("exceeds 16 bytes"));
}

#[tokio::test]
async fn test_analyze_honors_configured_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = AuditConfig::default()
        .with_ingest(IngestConfig::new().with_timeout(Duration::from_secs(1)));
    let source = SourceDescriptor::from(EndpointSource::new(format!("http://{}/", addr)));

    let started = Instant::now();
    let error = AuditEngine::new(config)
        .unwrap()
        .analyze(&source)
        .await
        .unwrap_err();

    // The HTTP client and the ingestion deadline share the same bound.
    assert!(matches!(error.kind(), "TimeoutError" | "FetchError"));
    assert!(started.elapsed() < Duration::from_secs(10));
}
