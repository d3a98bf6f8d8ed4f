//! Integration tests for the Clapper HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, CORS, and
//! origin gating without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clapper_core::Counter;
use clapper_core::config::{ServerConfig, SessionConfig};
use clapper_server::router::build_router;
use clapper_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn make_test_state(initial_ms: u64) -> Arc<AppState> {
    let server = ServerConfig {
        allowed_origins: vec![String::from("jarv.org")],
        max_sessions: 2,
        ..ServerConfig::default()
    };
    Arc::new(
        AppState::new(
            Arc::new(Counter::new(initial_ms, 1)),
            &server,
            SessionConfig::default(),
        )
        .unwrap(),
    )
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Home page
// =========================================================================

#[tokio::test]
async fn test_index_renders_counter() {
    let state = make_test_state(4_210_000);
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/")
                .header("host", "jarv.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.contains("text/html"));

    let page = body_to_string(response.into_body()).await;
    assert!(page.contains("1h:10m:10s"));
    assert!(page.contains("//jarv.org/ws"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let router = build_router(make_test_state(0));

    let response = router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Reset
// =========================================================================

#[tokio::test]
async fn test_reset_zeroes_counter() {
    let state = make_test_state(999_999);
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(Request::put("/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.counter.load(), 0);
    assert_eq!(state.current_display(), "0s");
}

#[tokio::test]
async fn test_reset_rejects_other_methods() {
    let state = make_test_state(5_000);
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(Request::get("/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(state.counter.load(), 5_000);
}

#[tokio::test]
async fn test_reset_echoes_allowed_origin() {
    let router = build_router(make_test_state(1));

    let response = router
        .oneshot(
            Request::put("/reset")
                .header("origin", "https://jarv.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://jarv.org"
    );
}

#[tokio::test]
async fn test_reset_omits_cors_for_unknown_origin() {
    let router = build_router(make_test_state(1));

    let response = router
        .oneshot(
            Request::put("/reset")
                .header("origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_reset_preflight_for_allowed_origin() {
    let state = make_test_state(42_000);
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(
            Request::options("/reset")
                .header("origin", "http://jarv.org")
                .header("access-control-request-method", "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://jarv.org"
    );
    let methods = response
        .headers()
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(methods.contains("PUT"));
    // A preflight never resets.
    assert_eq!(state.counter.load(), 42_000);
}

#[tokio::test]
async fn test_reset_preflight_for_unknown_origin() {
    let router = build_router(make_test_state(0));

    let response = router
        .oneshot(
            Request::options("/reset")
                .header("origin", "https://jarv.org.example.com")
                .header("access-control-request-method", "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn test_status_reports_counter_and_capacity() {
    let router = build_router(make_test_state(4_783_181_000));

    let response = router
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["display"], "55d:8h:39m:41s");
    assert_eq!(json["value_ms"], 4_783_181_000_u64);
    assert_eq!(json["active_sessions"], 0);
    assert_eq!(json["max_sessions"], 2);
    assert!(json["started_at"].is_string());
}

// =========================================================================
// WebSocket upgrade gating
// =========================================================================

#[tokio::test]
async fn test_ws_refuses_disallowed_origin() {
    let router = build_router(make_test_state(0));

    let response = router
        .oneshot(
            Request::get("/ws")
                .header("origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 403);
}

#[tokio::test]
async fn test_ws_requires_upgrade_request() {
    let router = build_router(make_test_state(0));

    let response = router
        .oneshot(
            Request::get("/ws")
                .header("origin", "https://jarv.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
}
