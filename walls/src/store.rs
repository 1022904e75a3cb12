//! Local persistence adapter.
//!
//! DESIGN
//! ======
//! Two operations only: `load` and `save`. Reads go through the compat
//! reader so every historical shape is accepted; writes always emit the
//! canonical record. A missing or garbled record reads as absent.
//!
//! Saves follow the same last-writer-wins rule as every other adapter: a
//! record that does not supersede the stored one is dropped without error.
//!
//! `FileStore` keeps one JSON document per key in a directory and replaces
//! it atomically (write temp file, then rename) so a crash mid-write never
//! leaves a torn record behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::codec::{encode_record, parse_stored};
use crate::model::SyncedRecord;

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("record serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-device persistence for the single synced record.
pub trait LocalStore: Send {
    /// Read the persisted record, if there is a readable one.
    fn load(&self) -> Option<SyncedRecord>;

    /// Replace the persisted record if `record` is strictly newer than it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    fn save(&self, record: &SyncedRecord) -> Result<(), StoreError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Directory-backed store holding `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self { path: dir.as_ref().join(format!("{key}.json")) }
    }

    /// Store under the deployment's fixed key.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, crate::STORAGE_KEY)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl LocalStore for FileStore {
    fn load(&self) -> Option<SyncedRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "local record unreadable");
                return None;
            }
        };
        let parsed = parse_stored(&raw);
        if parsed.is_none() {
            debug!(path = %self.path.display(), "local record is not valid json; treating as absent");
        }
        parsed
    }

    fn save(&self, record: &SyncedRecord) -> Result<(), StoreError> {
        if is_stale(record, self.load().as_ref()) {
            return Ok(());
        }
        let raw = encode_record(record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store. Clones share one slot, like two views on one device.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw text, bypassing the canonical writer.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { slot: Arc::new(Mutex::new(Some(raw.into()))) }
    }

    /// Raw text currently stored.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl LocalStore for MemoryStore {
    fn load(&self) -> Option<SyncedRecord> {
        self.raw().as_deref().and_then(parse_stored)
    }

    fn save(&self, record: &SyncedRecord) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if is_stale(record, slot.as_deref().and_then(parse_stored).as_ref()) {
            return Ok(());
        }
        *slot = Some(encode_record(record)?);
        Ok(())
    }
}

fn is_stale(record: &SyncedRecord, current: Option<&SyncedRecord>) -> bool {
    let Some(current) = current else {
        return false;
    };
    if record.supersedes(current.updated_at) {
        return false;
    }
    debug!(incoming = record.updated_at, stored = current.updated_at, "skipping save of stale record");
    true
}
