//! Axum router construction for the Clapper server.
//!
//! CORS is applied to the reset endpoint only. The preflight is answered
//! for every origin, but `Access-Control-Allow-Origin` is echoed only for
//! allowlisted ones.
//!
//! Every request must produce its response within [`REQUEST_TIMEOUT`] or
//! gets `408`. A `WebSocket` upgrade answers immediately, so sessions are
//! not affected.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, put};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Bound on the time from request arrival to response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Build the complete router.
///
/// - `GET /` -- counter page
/// - `GET /ws` -- `WebSocket` broadcast session
/// - `PUT /reset` -- zero the counter (CORS-enabled)
/// - `GET /api/status` -- JSON status
pub fn build_router(state: Arc<AppState>) -> Router {
    let origins = state.origins.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().is_ok_and(|o| origins.is_allowed(o))
            },
        ))
        .allow_methods([Method::PUT])
        .allow_headers([CONTENT_TYPE]);

    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_counter))
        .route("/reset", put(handlers::reset).layer(cors))
        .route("/api/status", get(handlers::status))
        .with_state(state);

    with_http_layers(router)
}

/// Request timeout and tracing shared by every route.
fn with_http_layers(router: Router) -> Router {
    router
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}
