//! Backend selection for the durable record.
//!
//! The backend is chosen once at startup from a single optional path and
//! then shared by the startup read and the persistence loop. New backends
//! extend [`CounterStore`] without touching its callers.

use std::path::PathBuf;

use crate::ephemeral::EphemeralStore;
use crate::error::StoreError;
use crate::file::FileStore;

/// The configured durable store.
#[derive(Debug)]
pub enum CounterStore {
    /// In-memory store; nothing survives a restart.
    Ephemeral(EphemeralStore),
    /// Single-file store.
    File(FileStore),
}

impl CounterStore {
    /// Select a backend: [`FileStore`] when a path is given, otherwise
    /// [`EphemeralStore`].
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or_else(
            || Self::Ephemeral(EphemeralStore::new()),
            |path| Self::File(FileStore::new(path)),
        )
    }

    /// Whether values written to this store survive a restart.
    ///
    /// The persistence loop does not run against non-durable stores.
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Short backend name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ephemeral(_) => "ephemeral",
            Self::File(_) => "file",
        }
    }

    /// Read the last persisted value. An absent record reads as `0`.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the file backend.
    pub async fn read(&self) -> Result<u64, StoreError> {
        match self {
            Self::Ephemeral(store) => Ok(store.read().await),
            Self::File(store) => store.read().await,
        }
    }

    /// Persist `value`, replacing the previous record.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the file backend.
    pub async fn write(&self, value: u64) -> Result<(), StoreError> {
        match self {
            Self::Ephemeral(store) => {
                store.write(value).await;
                Ok(())
            }
            Self::File(store) => store.write(value).await,
        }
    }
}
