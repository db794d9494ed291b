//! HttpTraceabilityResolver against a canned local server

use labeltrace_core::{
    ComplianceStatus, ErrorKind, Identifier, ResolutionToken, ResolverConfig, TraceabilityResolver,
};
use labeltrace_http::HttpTraceabilityResolver;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one response, reporting the request line that was received
async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let text = String::from_utf8_lossy(&request);
        let request_line = text.lines().next().unwrap_or_default().to_string();
        let _ = tx.send(request_line);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (addr, rx)
}

fn resolver_for(addr: SocketAddr) -> HttpTraceabilityResolver {
    let config = ResolverConfig {
        base_url: format!("http://{addr}/api/"),
        timeout_ms: 2_000,
    };
    HttpTraceabilityResolver::new(&config).unwrap()
}

const COMPLIANT: &str = r#"{"success":true,"product":{"name":"Wheat Flour","batch_number":"BATCH77"},"quality_checks":[],"labels":[],"workflow_logs":[],"traceability_score":85.0,"compliance_status":"compliant"}"#;

#[tokio::test]
async fn resolves_record_over_http() {
    let (addr, request) = serve_once("200 OK", COMPLIANT).await;
    let resolver = resolver_for(addr);

    let record = resolver
        .resolve(&Identifier::new("BATCH77"), ResolutionToken::new())
        .await
        .unwrap();

    assert_eq!(record.product.name, "Wheat Flour");
    assert_eq!(record.compliance_status, ComplianceStatus::Compliant);
    assert_eq!(
        request.await.unwrap(),
        "GET /api/traceability/BATCH77 HTTP/1.1"
    );
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let (addr, _request) = serve_once(
        "404 Not Found",
        r#"{"success":false,"error":"Product not found"}"#,
    )
    .await;

    let err = resolver_for(addr)
        .resolve(&Identifier::new("UNKNOWN99"), ResolutionToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn server_failure_is_unavailable() {
    let (addr, _request) = serve_once(
        "500 Internal Server Error",
        r#"{"success":false,"error":"database locked"}"#,
    )
    .await;

    let err = resolver_for(addr)
        .resolve(&Identifier::new("BATCH77"), ResolutionToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.to_string().contains("database locked"));
}

#[tokio::test]
async fn refused_connection_is_unavailable() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = resolver_for(addr)
        .resolve(&Identifier::new("BATCH77"), ResolutionToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

#[tokio::test]
async fn dot_identifier_is_not_found_without_request() {
    let (addr, mut request) = serve_once("200 OK", COMPLIANT).await;

    let err = resolver_for(addr)
        .resolve(&Identifier::new(".."), ResolutionToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(request.try_recv().is_err());
}
