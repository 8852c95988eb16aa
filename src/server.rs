//! # server: HTTP liveness endpoint
//!
//! A minimal axum server exposing `GET /ping`. It reports process
//! liveness only and is deliberately independent of pipeline state, so
//! an orchestrator restarts the process when it hangs, not when a cycle
//! fails.

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("liveness server failed: {0}")]
    Serve(std::io::Error),
}

/// Liveness HTTP server bound to a fixed address.
#[derive(Debug, Clone)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        info!(addr = %self.addr, "Liveness server listening");
        axum::serve(listener, router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ServerError::Serve)
    }
}

/// The liveness routes, exposed so tests can serve them on an
/// ephemeral listener.
pub fn router() -> Router {
    Router::new().route("/ping", get(ping))
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": 200 }))
}
