//! HTTP handlers for the Clapper server.
//!
//! | Method | Path          | Description                        |
//! |--------|---------------|------------------------------------|
//! | `GET`  | `/`           | Counter page                       |
//! | `PUT`  | `/reset`      | Zero the counter                   |
//! | `GET`  | `/api/status` | JSON status snapshot               |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use tracing::info;

use crate::error::ApiError;
use crate::state::{AppState, CounterStatus};

/// Host used in page links when the request carries no `Host` header.
const FALLBACK_HOST: &str = "localhost:8710";

/// Render the counter page.
///
/// The page opens a `WebSocket` back to the requested host and shows the
/// counter value at render time until the first push arrives.
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(FALLBACK_HOST);

    Ok(Html(state.render_home(host)?))
}

/// Zero the counter.
pub async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.reset_counter();
    info!("counter reset");
    StatusCode::OK
}

/// Current counter value and session usage.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<CounterStatus> {
    Json(state.status())
}
