use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqltrain_api::{ApiOptions, ApiServer, ApiServerError, ApiState, DatabaseHealth, HealthSource};
use sqltrain_readiness::ReadinessSnapshot;
use sqltrain_telemetry::Metrics;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

struct AlwaysReady;

#[async_trait]
impl HealthSource for AlwaysReady {
    fn phase(&self) -> &'static str {
        "ready"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn dependencies(&self) -> Vec<ReadinessSnapshot> {
        Vec::new()
    }

    async fn database(&self) -> DatabaseHealth {
        DatabaseHealth::Unavailable
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> anyhow::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[tokio::test]
async fn serves_until_shutdown_signal() -> anyhow::Result<()> {
    let listener = ApiServer::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ApiState::new("sql-training", "0.1.0", Arc::new(AlwaysReady), Metrics::new()?);
    let server = ApiServer::new(
        state,
        ApiOptions {
            cors_allow_any_origin: false,
            request_timing: false,
        },
    );
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let response = http_get(addr, "/health/ready").await?;
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected: {response}");
    assert!(response.contains(r#"{"status":"ready"}"#));

    let _ = stop_tx.send(());
    tokio::time::timeout(Duration::from_secs(5), handle).await???;
    assert!(TcpStream::connect(addr).await.is_err());
    Ok(())
}

#[tokio::test]
async fn bind_reports_address_in_use() -> anyhow::Result<()> {
    let first = ApiServer::bind("127.0.0.1:0").await?;
    let addr = first.local_addr()?;
    let err = ApiServer::bind(&addr.to_string())
        .await
        .expect_err("second bind must fail");
    match err {
        ApiServerError::Bind { addr: reported, .. } => assert_eq!(reported, addr.to_string()),
        other @ ApiServerError::Serve { .. } => panic!("unexpected error: {other}"),
    }
    Ok(())
}
