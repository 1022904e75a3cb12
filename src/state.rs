//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the single shared wall record plus a dirty flag for the snapshot
//! task. The record is replaced only by a strictly newer one; the check and
//! the replacement happen under one write lock.

use std::sync::Arc;

use tokio::sync::RwLock;
use walls::SyncedRecord;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

/// The stored record and whether it changed since the last snapshot.
#[derive(Debug, Default)]
pub struct WallState {
    pub record: SyncedRecord,
    pub dirty: bool,
}

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone, Default)]
pub struct AppState {
    pub wall: Arc<RwLock<WallState>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded from a loaded snapshot. Not marked dirty.
    #[must_use]
    pub fn with_record(record: SyncedRecord) -> Self {
        Self { wall: Arc::new(RwLock::new(WallState { record, dirty: false })) }
    }

    pub async fn snapshot(&self) -> SyncedRecord {
        self.wall.read().await.record.clone()
    }

    /// Store `incoming` if it is strictly newer. Returns whether it was applied.
    pub async fn apply(&self, incoming: SyncedRecord) -> bool {
        let mut wall = self.wall.write().await;
        let applied = wall.record.replace_if_newer(incoming);
        wall.dirty |= applied;
        applied
    }

    /// Take the record for flushing if it changed, clearing the flag.
    pub async fn take_dirty(&self) -> Option<SyncedRecord> {
        let mut wall = self.wall.write().await;
        if !wall.dirty {
            return None;
        }
        wall.dirty = false;
        Some(wall.record.clone())
    }

    /// Re-flag the record after a failed flush.
    pub async fn mark_dirty(&self) {
        self.wall.write().await.dirty = true;
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
