//! Shared application state for the Clapper server.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected into handlers through
//! axum's `State` extractor. It carries the counter, the admission pool,
//! the origin allowlist, session timing, and the compiled page template.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clapper_core::config::{ServerConfig, SessionConfig};
use clapper_core::{AdmissionPool, Counter, OriginAllowlist};
use minijinja::{Environment, context};

use crate::server::ServerError;

/// Template name of the home page.
const HOME_TEMPLATE_NAME: &str = "home.html";

/// Home page source, bundled at compile time.
const HOME_TEMPLATE: &str = include_str!("../templates/home.html");

/// JSON status served at `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CounterStatus {
    /// Rendered counter, as pushed to viewers.
    pub display: String,
    /// Raw counter value in milliseconds.
    pub value_ms: u64,
    /// Sessions currently holding an admission slot.
    pub active_sessions: usize,
    /// Admission pool capacity.
    pub max_sessions: usize,
    /// When this process started serving.
    pub started_at: DateTime<Utc>,
}

/// Shared state for the axum application.
#[derive(Debug)]
pub struct AppState {
    /// The process-wide counter.
    pub counter: Arc<Counter>,
    /// Gate on concurrent broadcast sessions.
    pub pool: AdmissionPool,
    /// Trusted `Origin` hosts.
    pub origins: OriginAllowlist,
    /// Per-session timing.
    pub session: SessionConfig,
    started_at: DateTime<Utc>,
    templates: Environment<'static>,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Template`] if the bundled page template does
    /// not compile.
    pub fn new(
        counter: Arc<Counter>,
        server: &ServerConfig,
        session: SessionConfig,
    ) -> Result<Self, ServerError> {
        let mut templates = Environment::new();
        templates.add_template(HOME_TEMPLATE_NAME, HOME_TEMPLATE)?;

        Ok(Self {
            counter,
            pool: AdmissionPool::new(server.max_sessions),
            origins: OriginAllowlist::new(&server.allowed_origins),
            session,
            started_at: Utc::now(),
            templates,
        })
    }

    /// The counter rendered for display.
    pub fn current_display(&self) -> String {
        self.counter.display()
    }

    /// Zero the counter. Every session sees the new value on its next push.
    pub fn reset_counter(&self) {
        self.counter.reset();
    }

    /// Whether `origin` is on the allowlist.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.origins.is_allowed(origin)
    }

    /// Current status snapshot.
    pub fn status(&self) -> CounterStatus {
        let value_ms = self.counter.load();
        CounterStatus {
            display: clapper_core::format_elapsed(value_ms),
            value_ms,
            active_sessions: self.pool.active(),
            max_sessions: self.pool.capacity(),
            started_at: self.started_at,
        }
    }

    /// Render the home page for a request addressed to `host`.
    ///
    /// # Errors
    ///
    /// Returns the template engine error if rendering fails.
    pub fn render_home(&self, host: &str) -> Result<String, minijinja::Error> {
        let template = self.templates.get_template(HOME_TEMPLATE_NAME)?;
        template.render(context! {
            host => host,
            display => self.current_display(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state(initial_ms: u64) -> AppState {
        AppState::new(
            Arc::new(Counter::new(initial_ms, 1)),
            &ServerConfig::default(),
            SessionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn reset_is_visible_to_display() {
        let state = state(190_000);
        assert_eq!(state.current_display(), "3m:10s");
        state.reset_counter();
        assert_eq!(state.current_display(), "0s");
    }

    #[test]
    fn status_reflects_pool_usage() {
        let state = state(12_000);
        let _slot = state.pool.try_admit().unwrap();

        let status = state.status();
        assert_eq!(status.display, "12s");
        assert_eq!(status.value_ms, 12_000);
        assert_eq!(status.active_sessions, 1);
        assert_eq!(status.max_sessions, 512);
    }

    #[test]
    fn home_page_embeds_host_and_display() {
        let state = state(4_210_000);
        let page = state.render_home("jarv.org:8710").unwrap();
        assert!(page.contains("1h:10m:10s"));
        assert!(page.contains("//jarv.org:8710/ws"));
        assert!(page.contains("//jarv.org:8710/reset"));
    }

    #[test]
    fn home_page_escapes_host() {
        let state = state(0);
        let page = state.render_home("<script>").unwrap();
        assert!(!page.contains("//<script>/ws"));
    }
}
