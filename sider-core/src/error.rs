use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is not present in the store
    #[error("key doesn't exist: {0}")]
    NotFound(String),
}

/// Errors returned while saving or loading a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be opened, created or written
    #[error("snapshot I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table could not be serialized
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] bincode::Error),

    /// The file contents are not a valid snapshot
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] bincode::Error),
}

impl SnapshotError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
