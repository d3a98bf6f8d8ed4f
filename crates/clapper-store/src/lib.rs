//! Durable storage for the Clapper counter.
//!
//! The counter is checkpointed as a single value: the elapsed milliseconds
//! rendered as a decimal string. This crate provides the two backends that
//! can hold that value and the tagged variant the rest of the service is
//! handed at startup.
//!
//! ```text
//! startup ----- read() ----+
//!                          v
//!                   CounterStore ----> EphemeralStore (no path configured)
//!                          ^      \--> FileStore      (path configured)
//! persist tick -- write() -+
//! ```
//!
//! # Modules
//!
//! - [`backend`] -- [`CounterStore`], the backend selected once at startup
//! - [`ephemeral`] -- in-memory store, lost on restart
//! - [`file`] -- single-file store surviving restarts
//! - [`error`] -- shared error type

pub mod backend;
pub mod ephemeral;
pub mod error;
pub mod file;

// Re-export primary types for convenience.
pub use backend::CounterStore;
pub use ephemeral::EphemeralStore;
pub use error::StoreError;
pub use file::FileStore;
