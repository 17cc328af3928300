//! Health-check listener.
//!
//! When started without `--notify` the process only has to prove it is alive
//! to the platform's health checker, so it answers `200 ok` on `/` and
//! `/healthz` and does nothing else.

use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::NotifyError;

/// Router with the health endpoints.
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/healthz", get(health_handler))
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Serve the health endpoints on `0.0.0.0:port` until the process exits.
///
/// # Errors
///
/// Returns [`NotifyError::Server`] if the port cannot be bound or the server
/// stops with an I/O error.
pub async fn serve(port: u16) -> Result<(), NotifyError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| NotifyError::Server {
            addr: addr.to_string(),
            source,
        })?;
    serve_on(listener).await
}

/// Serve the health endpoints on an already bound listener.
///
/// # Errors
///
/// Returns [`NotifyError::Server`] if the server stops with an I/O error.
pub async fn serve_on(listener: TcpListener) -> Result<(), NotifyError> {
    let addr = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown address".to_string());
    info!(addr = %addr, "health-check listener started");
    axum::serve(listener, create_router())
        .await
        .map_err(|source| NotifyError::Server { addr, source })
}
