//! Process-wide elapsed-time counter.
//!
//! The counter holds milliseconds in a single [`AtomicU64`]. It is advanced
//! by the increment loop at sub-millisecond cadence while every broadcast
//! session and the persistence loop read it concurrently, so all access goes
//! through atomic load/add/store and never through a lock.
//!
//! # Display format
//!
//! [`format_elapsed`] decomposes milliseconds into days, hours, minutes, and
//! whole seconds. Leading units are emitted only when non-zero; seconds are
//! always emitted. Components are joined with `:`:
//!
//! | Milliseconds    | Display            |
//! |-----------------|--------------------|
//! | `0`             | `0s`               |
//! | `12_000`        | `12s`              |
//! | `4_210_000`     | `1h:10m:10s`       |
//! | `4_783_181_000` | `55d:8h:39m:41s`   |

use std::sync::atomic::{AtomicU64, Ordering};

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1_000;
/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
/// Milliseconds per hour.
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
/// Milliseconds per day.
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Default amount added by each increment.
pub const DEFAULT_TICK_QUANTUM_MS: u64 = 1;

/// Lock-free elapsed-time counter.
///
/// Shared behind an [`Arc`](std::sync::Arc) by the increment loop, the
/// persistence loop, every broadcast session, and the reset handler.
#[derive(Debug)]
pub struct Counter {
    /// Elapsed milliseconds since start or last reset.
    value: AtomicU64,
    /// Milliseconds added per [`inc`](Self::inc).
    quantum_ms: u64,
}

impl Counter {
    /// Create a counter seeded from the durable record.
    pub const fn new(initial_ms: u64, quantum_ms: u64) -> Self {
        Self {
            value: AtomicU64::new(initial_ms),
            quantum_ms,
        }
    }

    /// Advance by one tick quantum.
    pub fn inc(&self) {
        self.value.fetch_add(self.quantum_ms, Ordering::AcqRel);
    }

    /// Current value in milliseconds.
    pub fn load(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the value back to exactly zero.
    ///
    /// Readers observe zero as soon as this returns.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }

    /// Render the current value with [`format_elapsed`].
    pub fn display(&self) -> String {
        format_elapsed(self.load())
    }

    /// Milliseconds added per increment.
    pub const fn quantum_ms(&self) -> u64 {
        self.quantum_ms
    }
}

/// Render milliseconds as a `55d:8h:39m:41s` style duration.
///
/// Sub-second remainders are truncated.
pub fn format_elapsed(ms: u64) -> String {
    let (days, rest) = split(ms, MS_PER_DAY);
    let (hours, rest) = split(rest, MS_PER_HOUR);
    let (minutes, rest) = split(rest, MS_PER_MINUTE);
    let (seconds, _) = split(rest, MS_PER_SECOND);

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));

    parts.join(":")
}

/// Whole units of `unit` in `ms`, and the remainder.
fn split(ms: u64, unit: u64) -> (u64, u64) {
    (
        ms.checked_div(unit).unwrap_or(0),
        ms.checked_rem(unit).unwrap_or(ms),
    )
}
