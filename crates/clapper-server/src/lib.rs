//! HTTP and `WebSocket` server for the Clapper counter.
//!
//! This crate exposes the shared [`Counter`] to browsers:
//!
//! - **`WebSocket` endpoint** (`/ws`) -- one [`session`] per viewer pushing
//!   the rendered counter every write period, kept alive with pings
//! - **Reset endpoint** (`PUT /reset`) -- zeroes the counter, with CORS for
//!   allowlisted origins
//! - **Home page** (`GET /`) -- counter page rendered from a bundled template
//! - **Status endpoint** (`GET /api/status`) -- JSON snapshot
//!
//! # Architecture
//!
//! Sessions never share state with each other. Each one reads the counter
//! atomically on its own timer, so two viewers may see slightly different
//! values at the same instant. Concurrency is capped by an
//! [`AdmissionPool`]; a viewer arriving when the pool is full is
//! disconnected immediately.
//!
//! [`Counter`]: clapper_core::Counter
//! [`AdmissionPool`]: clapper_core::AdmissionPool

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use session::{SessionEnd, SessionTeardown, run_session};
pub use state::{AppState, CounterStatus};
