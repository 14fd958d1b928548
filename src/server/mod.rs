//! Diagnostic tool server
//!
//! A loopback HTTP endpoint exposing the tool registry over JSON-RPC.
//! `GET /health` reports liveness; `POST /rpc` takes one JSON-RPC request.

pub mod rpc;

use crate::tools::ToolRegistry;
use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tools: usize,
}

/// Build the router over a shared registry.
pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc_handler))
        .with_state(registry)
}

async fn health_handler(State(registry): State<Arc<ToolRegistry>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tools: registry.len(),
    })
}

async fn rpc_handler(
    State(registry): State<Arc<ToolRegistry>>,
    body: Bytes,
) -> Json<rpc::RpcResponse> {
    let response = match rpc::parse_request(&body) {
        Ok(request) => rpc::dispatch(&registry, request).await,
        Err(response) => response,
    };
    if let Some(error) = &response.error {
        warn!(code = error.code, message = %error.message, "rpc error");
    }
    Json(response)
}

/// Bind `host:port` (names are resolved) and serve until Ctrl-C.
pub async fn serve(host: &str, port: u16, registry: Arc<ToolRegistry>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })?;
    let local = listener.local_addr()?;
    if !local.ip().is_loopback() {
        warn!(address = %local, "tool server is listening on a non-loopback address");
    }
    info!(address = %local, tools = registry.len(), "Starting tool server");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tool server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
