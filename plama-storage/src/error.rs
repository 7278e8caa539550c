//! Error types for the storage layer.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error on a specific path.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An identity-bearing file could not be parsed.
    #[error("record error in {}: {source}", path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: plama_types::Error,
    },

    /// Object or line not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A blocking rescan panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn record(path: &Path, source: plama_types::Error) -> Self {
        Self::Record {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this is an IO error for a file that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Self::NotFound(_) => true,
            _ => false,
        }
    }
}
