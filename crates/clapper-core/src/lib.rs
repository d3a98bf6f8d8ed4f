//! Core state and background loops for the Clapper service.
//!
//! A single process-wide [`Counter`] of elapsed milliseconds advances on a
//! fixed tick, is read by every connected viewer, can be reset on demand,
//! and is checkpointed to a [`CounterStore`] so a restart resumes near where
//! it left off.
//!
//! # Modules
//!
//! - [`counter`] -- lock-free elapsed-time counter and its display format
//! - [`admission`] -- bounded, non-blocking gate on concurrent viewers
//! - [`origin`] -- `Origin` header allowlist
//! - [`config`] -- typed configuration loaded from YAML and the environment
//! - [`ticker`] -- increment and persistence loops
//!
//! [`Counter`]: counter::Counter
//! [`CounterStore`]: clapper_store::CounterStore

pub mod admission;
pub mod config;
pub mod counter;
pub mod origin;
pub mod ticker;

// Re-export primary types for convenience.
pub use admission::{AdmissionError, AdmissionPool, AdmissionSlot};
pub use config::{ClapperConfig, ConfigError};
pub use counter::{Counter, format_elapsed};
pub use origin::OriginAllowlist;
pub use ticker::{PersistError, run_increment_loop, run_persistence_loop};
