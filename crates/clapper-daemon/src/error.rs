//! Error types for the Clapper daemon binary.
//!
//! [`DaemonError`] is the top-level error type that wraps all possible
//! failure modes during startup and while serving.

/// Top-level error for the Clapper daemon.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: clapper_core::ConfigError,
    },

    /// The initial counter value could not be read.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: clapper_store::StoreError,
    },

    /// A checkpoint write failed while running.
    #[error("persistence error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: clapper_core::PersistError,
    },

    /// The HTTP server failed to start or stopped with an error.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: clapper_server::ServerError,
    },

    /// A background task panicked or was aborted.
    #[error("task error: {source}")]
    Task {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
