//! In-memory counter store.
//!
//! Used when no persistence path is configured. The value lives only as
//! long as the process does.

use tokio::sync::RwLock;

/// Store holding the last written value in memory.
#[derive(Debug, Default)]
pub struct EphemeralStore {
    value: RwLock<u64>,
}

impl EphemeralStore {
    /// Create an empty store. The first read returns `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the last written value, or `0` if nothing was written.
    pub async fn read(&self) -> u64 {
        *self.value.read().await
    }

    /// Replace the stored value.
    pub async fn write(&self, value: u64) {
        *self.value.write().await = value;
    }
}
