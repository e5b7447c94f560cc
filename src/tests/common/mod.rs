// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use anyhow::Result;

use crate::config::proc_loader::parse_config;
use crate::ServiceConfig;

pub const TOKEN_PATH: &str = "/oauth/token";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Parsed and validated config pointing at local mock servers.
/// Retries are fast (10 ms base delay) so scenarios finish quickly.
pub async fn service_config(token_url: &str, base_url: &str, timeout_ms: u64) -> Result<ServiceConfig> {
    let yaml = format!(
        r#"
settings:
  retry:
    attempts: 3
    base_delay_ms: 10
    max_delay_ms: 100
  server:
    host: 127.0.0.1
    port: "0"
  logging:
    level: debug
    format: compact
auth:
  token_url: {token_url}
  client_id: {{ value: facade-client }}
  client_secret: {{ value: facade-secret }}
upstream:
  base_url: {base_url}
  timeout_ms: {timeout_ms}
cache:
  schema_ttl_seconds: 900
  service_types_ttl_seconds: 600
"#
    );
    parse_config(yaml).await
}
