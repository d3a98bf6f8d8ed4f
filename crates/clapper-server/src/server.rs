//! Clapper HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP address and runs the
//! axum server until the shutdown token is cancelled.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Start the HTTP server on `addr`.
///
/// Returns `Ok(())` once `shutdown` is cancelled and in-flight requests
/// have drained.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or cannot be
/// bound, or [`ServerError::Serve`] on a fatal I/O error while serving.
pub async fn start_server(
    addr: &str,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address {addr}: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Clapper server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Clapper server stopped");
    Ok(())
}

/// Errors that can occur when building or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),

    /// The bundled page template failed to compile.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}
