//! `WebSocket` upgrade for broadcast sessions.
//!
//! Viewers connect to `GET /ws`. A request carrying an `Origin` header that
//! is not allowlisted is refused with `403` before the upgrade; a request
//! without one (a non-browser client) is let through. Malformed upgrade
//! requests are rejected by the extractor and not logged. Once upgraded,
//! the connection is handed to [`run_session`].

use std::io;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::run_session;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` broadcast session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_counter(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Some(origin) = headers.get(ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !state.is_origin_allowed(origin) {
            debug!(origin, "refusing upgrade from disallowed origin");
            return ApiError::OriginNotAllowed(origin.to_owned()).into_response();
        }
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    upgrade
        .max_message_size(state.session.max_message_bytes)
        .on_failed_upgrade(log_failed_upgrade)
        .on_upgrade(move |socket| accept_session(socket, state))
}

/// Report a connection that failed after the handshake response.
///
/// A peer that hung up in the meantime is routine and only logged at
/// `debug`.
fn log_failed_upgrade(e: axum::Error) {
    if is_peer_gone(&e) {
        debug!(error = %e, "peer left before websocket upgrade completed");
    } else {
        warn!(error = %e, "websocket upgrade failed");
    }
}

/// Whether an I/O error somewhere in the chain means the peer disconnected.
fn is_peer_gone(e: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = err.source();
    }
    false
}

/// Run an upgraded connection through the session state machine.
pub async fn accept_session(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    run_session(
        socket,
        &state.counter,
        &state.pool,
        &state.session,
        session_id,
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_connection_counts_as_peer_gone() {
        let e = axum::Error::new(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(is_peer_gone(&e));

        let e = axum::Error::new(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(is_peer_gone(&e));
    }

    #[test]
    fn other_failures_are_not_peer_gone() {
        let e = axum::Error::new(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(!is_peer_gone(&e));

        let e = axum::Error::new("protocol violation");
        assert!(!is_peer_gone(&e));
    }
}
