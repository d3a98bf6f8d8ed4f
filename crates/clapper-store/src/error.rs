//! Error types for the storage layer.
//!
//! A missing file is never an error; see [`FileStore::read`].
//!
//! [`FileStore::read`]: crate::file::FileStore::read

use std::num::ParseIntError;
use std::path::PathBuf;

/// Errors that can occur while reading or writing the durable record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record file exists but could not be read.
    #[error("failed to read counter file {path}: {source}")]
    Read {
        /// Path of the record file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The record file could not be created or written.
    #[error("failed to write counter file {path}: {source}")]
    Write {
        /// Path of the record file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The record file does not contain a decimal `u64`.
    #[error("malformed counter file {path}: {source}")]
    Parse {
        /// Path of the record file.
        path: PathBuf,
        /// The underlying integer parse error.
        source: ParseIntError,
    },
}
