//! Bounded admission gate for broadcast sessions.
//!
//! Each live session holds exactly one [`AdmissionSlot`]. Admission never
//! waits: when every slot is taken the attempt fails immediately with
//! [`AdmissionError::Full`] and the connection is turned away.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Errors returned by [`AdmissionPool::try_admit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// All slots are held by live sessions.
    #[error("admission pool full ({capacity} sessions)")]
    Full {
        /// Configured capacity of the pool.
        capacity: usize,
    },

    /// The pool has been closed and admits nobody.
    #[error("admission pool closed")]
    Closed,
}

/// Counting gate limiting concurrently active sessions.
///
/// Cloning yields another handle to the same pool.
#[derive(Debug, Clone)]
pub struct AdmissionPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionPool {
    /// Create a pool with room for `capacity` concurrent sessions.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Try to take a slot without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Full`] when no slot is free, or
    /// [`AdmissionError::Closed`] after [`close`](Self::close).
    pub fn try_admit(&self) -> Result<AdmissionSlot, AdmissionError> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(AdmissionSlot {
                permit: Some(permit),
            }),
            Err(TryAcquireError::NoPermits) => Err(AdmissionError::Full {
                capacity: self.capacity,
            }),
            Err(TryAcquireError::Closed) => Err(AdmissionError::Closed),
        }
    }

    /// Stop admitting new sessions. Slots already held stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Maximum number of concurrent sessions.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of slots currently held.
    pub fn active(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

/// One admitted session's claim on the pool.
///
/// The slot goes back to the pool on [`release`](Self::release) or on drop,
/// whichever comes first, and never more than once.
#[derive(Debug)]
pub struct AdmissionSlot {
    permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionSlot {
    /// Return the slot to the pool.
    ///
    /// Returns `true` if this call released it, `false` if it was already
    /// released.
    pub fn release(&mut self) -> bool {
        self.permit.take().is_some()
    }

    /// Whether the slot is still held.
    pub const fn is_held(&self) -> bool {
        self.permit.is_some()
    }
}
