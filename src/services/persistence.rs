//! Persistence service: periodic snapshot of the shared record to disk.
//!
//! DESIGN
//! ======
//! The server keeps the record in memory. When a snapshot directory is
//! configured, a background task writes the record through a `FileStore`
//! whenever it changed since the last flush, and the record is loaded from
//! the same file at startup.
//!
//! ERROR HANDLING
//! ==============
//! The dirty flag is cleared before the write and restored if the write
//! fails, so a failed flush is retried on the next tick. A POST landing
//! during a flush re-flags the record and is written on the next tick.

use std::path::Path;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use walls::SyncedRecord;
use walls::store::{FileStore, LocalStore};

use crate::state::AppState;

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;

/// Open the snapshot file in `dir` and load whatever it holds.
pub fn open_snapshot(dir: &Path) -> (FileStore, SyncedRecord) {
    let store = FileStore::in_dir(dir);
    let record = store.load().unwrap_or_default();
    info!(
        path = %store.path().display(),
        updated_at = record.updated_at,
        walls = record.images.len(),
        "wall state snapshot loaded"
    );
    (store, record)
}

/// Write the record if it changed. Returns whether a write succeeded.
pub async fn flush_snapshot(state: &AppState, store: &FileStore) -> bool {
    let Some(record) = state.take_dirty().await else {
        return false;
    };
    match store.save(&record) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, updated_at = record.updated_at, "snapshot flush failed; will retry");
            state.mark_dirty().await;
            false
        }
    }
}

/// Spawn the background snapshot task. Returns a handle for shutdown.
pub fn spawn_snapshot_task(state: AppState, store: FileStore, flush_ms: u64) -> JoinHandle<()> {
    info!(flush_ms, path = %store.path().display(), "snapshot flush configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(flush_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            flush_snapshot(&state, &store).await;
        }
    })
}
