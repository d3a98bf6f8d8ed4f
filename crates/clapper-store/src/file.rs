//! File-backed counter store.
//!
//! The durable record is one text file holding the counter as a decimal
//! string with no trailing newline. Each write truncates and rewrites the
//! file in place. A file that does not exist yet reads as `0`, so a fresh
//! deployment starts counting from zero instead of refusing to boot.

use std::io::ErrorKind;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

/// Store persisting the counter to a single file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes the startup read against the periodic writes.
    lock: RwLock<()>,
}

impl FileStore {
    /// Create a store bound to `path`. The file is not touched until the
    /// first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Return the path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted value.
    ///
    /// Returns `Ok(0)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the file exists but cannot be read,
    /// or [`StoreError::Parse`] if its contents are not a decimal `u64`.
    pub async fn read(&self) -> Result<u64, StoreError> {
        let _guard = self.lock.read().await;

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "counter file absent, starting from zero");
                return Ok(0);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        decode(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the record file with `value`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] on any I/O failure.
    pub async fn write(&self, value: u64) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;

        tokio::fs::write(&self.path, encode(value))
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Render a value in the on-disk format.
fn encode(value: u64) -> String {
    value.to_string()
}

/// Parse the on-disk format. A trailing newline left by a hand edit is
/// tolerated; anything else that is not a decimal `u64` is rejected.
fn decode(contents: &str) -> Result<u64, ParseIntError> {
    contents.trim_end_matches(['\n', '\r']).parse()
}
