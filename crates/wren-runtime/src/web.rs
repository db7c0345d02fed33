//! Health-check web server.
//!
//! Serves `GET /health` → `ok` so process supervisors and load balancers
//! can probe the bot. TLS is not terminated here.

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WebConfig;
use crate::error::RuntimeResult;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// Binds the health server and serves it until `shutdown` is cancelled.
pub async fn serve(
    config: &WebConfig,
    shutdown: CancellationToken,
) -> RuntimeResult<(SocketAddr, JoinHandle<()>)> {
    if !config.no_ssl {
        warn!(
            ssl_port = config.ssl_port,
            "TLS is not supported; serving plain HTTP only (set WEB_NO_SSL to silence)"
        );
    }

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Web server listening");

    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(e) = server.await {
            error!(error = %e, "Web server error");
        }
    });

    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_health_endpoint() {
        let config = WebConfig {
            host: "127.0.0.1".into(),
            port: 0,
            no_ssl: true,
            ..Default::default()
        };
        let token = CancellationToken::new();
        let (addr, handle) = serve(&config, token.clone()).await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));

        token.cancel();
        handle.await.unwrap();
    }
}
