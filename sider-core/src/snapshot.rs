//! Snapshot persistence
//!
//! A snapshot is the whole key → entry table serialized with `bincode` into a
//! single file. There is no header or version tag, so a change to [`Entry`]
//! makes older snapshots unreadable.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::entry::Entry;
use crate::error::SnapshotError;
use crate::store::Store;

impl Store {
    /// Writes the whole table to `path`, replacing any existing file
    ///
    /// The table is copied under the lock and encoded after the lock is
    /// released, so a slow disk never stalls other callers. The snapshot is
    /// written to a temporary file in the same directory and renamed over
    /// `path`, so a failed save leaves the previous snapshot intact.
    ///
    /// Returns the number of entries written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();
        let entries = self.entries();

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SnapshotError::io(path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, &entries).map_err(SnapshotError::Encode)?;
            writer.flush().map_err(|e| SnapshotError::io(path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| SnapshotError::io(path, e))?;
        tmp.persist(path)
            .map_err(|e| SnapshotError::io(path, e.error))?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "snapshot saved");
        Ok(entries.len())
    }

    /// Restores a store from a snapshot written by [`Store::save_to`]
    ///
    /// On error the caller keeps whatever state it had; nothing is modified.
    /// Length prefixes are checked against the bytes actually in the file, so
    /// a corrupt snapshot is a [`SnapshotError::Decode`], never an oversized
    /// allocation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Store, SnapshotError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| SnapshotError::io(path, e))?;

        let entries: HashMap<String, Entry> =
            bincode::deserialize(&bytes).map_err(SnapshotError::Decode)?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "snapshot loaded");
        Ok(Store::from_entries(entries))
    }
}
