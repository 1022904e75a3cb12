//! Sync orchestrator: the single owner of wall state on a client.
//!
//! DESIGN
//! ======
//! `WallSync` holds the canonical `WallImageState` and a watermark (the
//! timestamp of the last state it applied). Every local edit is staged in
//! memory and then dispatched: sanitize, persist locally under a fresh
//! timestamp, advance the watermark, broadcast to same-device views, push
//! to the remote store. Incoming state (remote poll or tab message) is
//! adopted only when its timestamp is strictly above the watermark.
//!
//! Conflict policy is last-writer-wins on the whole record. Two clients
//! editing different walls at once overwrite each other; an adopted record
//! also discards any local edit that was staged but not yet dispatched.
//!
//! CONCURRENCY
//! ===========
//! `run` drives one cooperative loop over commands, poll ticks and tab
//! messages. Only that task touches the state, so read-then-write needs no
//! locks. A poll that resolves after a newer local write simply loses the
//! timestamp comparison.
//!
//! ERROR HANDLING
//! ==============
//! Local persist and remote push failures are logged and swallowed: the
//! in-memory state is this client's source of truth, and the next poll or
//! edit converges everything else. Poll failures are skipped without
//! backoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::blobs::{BlobError, BlobRegistry, DEFAULT_INLINE_LIMIT_BYTES, encode_data_uri};
use crate::codec::{decode_tab_payload, encode_tab_payload};
use crate::model::{PanelSize, SyncedRecord, Transform, TransformPatch, WallEntry, WallId, WallImageState};
use crate::remote::RemoteStore;
use crate::sanitize::sanitize_state;
use crate::store::LocalStore;
use crate::tabs::TabChannel;

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// CLOCK
// =============================================================================

/// Source of record timestamps (ms since the Unix epoch).
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(_) => 0,
        }
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    #[must_use]
    pub fn at(ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(ms)))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Orchestrator tuning, loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote poll period.
    pub poll_interval: Duration,
    /// Uploads at or below this many bytes are inlined as data URIs.
    pub inline_limit_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            inline_limit_bytes: DEFAULT_INLINE_LIMIT_BYTES,
        }
    }
}

impl SyncConfig {
    /// `WALLSYNC_POLL_MS` and `WALLSYNC_INLINE_LIMIT_BYTES`, with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(env_parse("WALLSYNC_POLL_MS", DEFAULT_POLL_INTERVAL_MS).max(1)),
            inline_limit_bytes: env_parse("WALLSYNC_INLINE_LIMIT_BYTES", DEFAULT_INLINE_LIMIT_BYTES),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// EDITS AND COMMANDS
// =============================================================================

/// A local edit to wall state.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Replace the wall's image, resetting its transform.
    SetImage { wall: WallId, src: String, panel: Option<PanelSize> },
    /// Merge a partial transform into an occupied wall.
    UpdateTransform { wall: WallId, patch: TransformPatch, panel: Option<PanelSize> },
    /// Restore the identity transform on an occupied wall.
    ResetTransform { wall: WallId },
    /// Empty the wall.
    ClearImage { wall: WallId },
}

/// Messages accepted by the [`WallSync::run`] loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    Edit(Edit),
    Upload { wall: WallId, bytes: Vec<u8>, mime: String, panel: Option<PanelSize> },
    /// Poll the remote store now instead of waiting for the next tick.
    PullNow,
}

/// Result of a local edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// State changed and was dispatched under this timestamp.
    Committed(i64),
    /// Nothing to do (empty wall, empty source, or nothing staged).
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("wall sync loop has stopped")]
pub struct SyncStopped;

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Owner of the canonical wall state for one client.
pub struct WallSync<L, R, T> {
    images: WallImageState,
    watermark: i64,
    pending: bool,
    local: L,
    remote: R,
    tabs: T,
    blobs: BlobRegistry,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    state_tx: watch::Sender<SyncedRecord>,
}

impl<L, R, T> WallSync<L, R, T>
where
    L: LocalStore,
    R: RemoteStore,
    T: TabChannel,
{
    /// Hydrate from the local store and wire up the adapters.
    pub fn new(local: L, remote: R, tabs: T) -> Self {
        let stored = local.load().unwrap_or_default();
        let images = sanitize_state(&stored.images);
        let (state_tx, _) = watch::channel(SyncedRecord::new(images.clone(), stored.updated_at));
        debug!(watermark = stored.updated_at, walls = images.len(), "wall sync hydrated from local store");
        Self {
            images,
            watermark: stored.updated_at,
            pending: false,
            local,
            remote,
            tabs,
            blobs: BlobRegistry::in_temp_dir(),
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
            state_tx,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_blobs(mut self, blobs: BlobRegistry) -> Self {
        self.blobs = blobs;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn images(&self) -> &WallImageState {
        &self.images
    }

    #[must_use]
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Observe every state this client applies, local or adopted.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncedRecord> {
        self.state_tx.subscribe()
    }

    // -------------------------------------------------------------------------
    // Local edits
    // -------------------------------------------------------------------------

    pub async fn set_image(&mut self, wall: WallId, src: impl Into<String>) -> Mutation {
        self.apply(Edit::SetImage { wall, src: src.into(), panel: None }).await
    }

    /// Like [`Self::set_image`], recording the panel size the image was placed on.
    pub async fn set_image_on_panel(&mut self, wall: WallId, src: impl Into<String>, panel: PanelSize) -> Mutation {
        self.apply(Edit::SetImage { wall, src: src.into(), panel: Some(panel) }).await
    }

    pub async fn update_transform(&mut self, wall: WallId, patch: TransformPatch) -> Mutation {
        self.apply(Edit::UpdateTransform { wall, patch, panel: None }).await
    }

    /// Like [`Self::update_transform`], recording the panel size the edit was made on.
    pub async fn update_transform_on_panel(&mut self, wall: WallId, patch: TransformPatch, panel: PanelSize) -> Mutation {
        self.apply(Edit::UpdateTransform { wall, patch, panel: Some(panel) }).await
    }

    pub async fn reset_transform(&mut self, wall: WallId) -> Mutation {
        self.apply(Edit::ResetTransform { wall }).await
    }

    pub async fn clear_image(&mut self, wall: WallId) -> Mutation {
        self.apply(Edit::ClearImage { wall }).await
    }

    /// Place uploaded bytes on a wall. Small payloads are inlined; large
    /// ones get a temporary handle owned by this client.
    ///
    /// # Errors
    ///
    /// Returns an error if a temporary handle cannot be written. State is
    /// untouched in that case.
    pub async fn upload_image(
        &mut self,
        wall: WallId,
        bytes: &[u8],
        mime: &str,
        panel: Option<PanelSize>,
    ) -> Result<Mutation, BlobError> {
        let src = if bytes.len() <= self.config.inline_limit_bytes {
            encode_data_uri(bytes, mime)
        } else {
            self.blobs.allocate(bytes)?
        };
        Ok(self.apply(Edit::SetImage { wall, src, panel }).await)
    }

    /// Stage and immediately dispatch one edit.
    pub async fn apply(&mut self, edit: Edit) -> Mutation {
        if self.stage(edit) { self.dispatch().await } else { Mutation::Unchanged }
    }

    /// Apply an edit to in-memory state only. Returns whether anything changed.
    pub fn stage(&mut self, edit: Edit) -> bool {
        let changed = match edit {
            Edit::SetImage { wall, src, panel } => self.stage_set_image(wall, src, panel),
            Edit::UpdateTransform { wall, patch, panel } => {
                let Some(entry) = self.images.get_mut(&wall) else {
                    return false;
                };
                entry.transform = entry.transform.merged(&patch);
                if let Some(panel) = panel {
                    entry.ref_width = Some(panel.width);
                    entry.ref_height = Some(panel.height);
                }
                true
            }
            Edit::ResetTransform { wall } => {
                let Some(entry) = self.images.get_mut(&wall) else {
                    return false;
                };
                entry.transform = Transform::IDENTITY;
                true
            }
            Edit::ClearImage { wall } => {
                let Some(previous) = self.images.remove(&wall) else {
                    return false;
                };
                self.blobs.release(&previous.src);
                true
            }
        };
        self.pending |= changed;
        changed
    }

    fn stage_set_image(&mut self, wall: WallId, src: String, panel: Option<PanelSize>) -> bool {
        if src.is_empty() {
            warn!(%wall, "ignoring image with empty source");
            return false;
        }
        let previous = self.images.get(&wall);
        let mut entry = WallEntry::new(src);
        entry.ref_width = panel.map(|p| p.width).or_else(|| previous.and_then(|p| p.ref_width));
        entry.ref_height = panel.map(|p| p.height).or_else(|| previous.and_then(|p| p.ref_height));

        if let Some(old) = previous.filter(|p| p.src != entry.src).map(|p| p.src.clone()) {
            self.blobs.release(&old);
        }
        self.blobs.track(&entry.src);
        self.images.insert(wall, entry);
        true
    }

    /// Dispatch staged edits: sanitize, persist, advance the watermark,
    /// broadcast, push.
    pub async fn dispatch(&mut self) -> Mutation {
        if !self.pending {
            return Mutation::Unchanged;
        }
        self.pending = false;

        self.images = sanitize_state(&self.images);
        // Never mint a timestamp at or below one already applied.
        let updated_at = self.clock.now_ms().max(self.watermark.saturating_add(1));
        let record = SyncedRecord::new(self.images.clone(), updated_at);

        if let Err(e) = self.local.save(&record) {
            warn!(error = %e, updated_at, "local persist failed");
        }
        self.watermark = updated_at;
        self.state_tx.send_replace(record.clone());

        match encode_tab_payload(&record) {
            Ok(payload) => self.tabs.publish(payload),
            Err(e) => warn!(error = %e, "tab broadcast encode failed"),
        }

        match self.remote.save(&record).await {
            Ok(applied) => debug!(updated_at, applied, "remote push"),
            Err(e) => warn!(error = %e, updated_at, "remote push failed"),
        }

        Mutation::Committed(updated_at)
    }

    // -------------------------------------------------------------------------
    // Incoming state
    // -------------------------------------------------------------------------

    /// Poll the remote store once. Returns whether newer state was adopted.
    pub async fn pull_remote(&mut self) -> bool {
        match self.remote.load().await {
            Ok(Some(record)) => self.adopt(record, "remote"),
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, "remote poll failed; retrying next tick");
                false
            }
        }
    }

    /// Handle a message from another view on this device.
    pub fn receive_tab(&mut self, payload: &Value) -> bool {
        match decode_tab_payload(payload) {
            Some(record) => self.adopt(record, "tab"),
            None => {
                debug!("ignoring undecodable tab message");
                false
            }
        }
    }

    fn adopt(&mut self, record: SyncedRecord, source: &'static str) -> bool {
        if !record.supersedes(self.watermark) {
            return false;
        }
        if self.pending {
            info!(source, updated_at = record.updated_at, "newer state replaces undispatched local edit");
        }
        self.images = sanitize_state(&record.images);
        self.watermark = record.updated_at;
        self.pending = false;

        let applied = SyncedRecord::new(self.images.clone(), record.updated_at);
        if let Err(e) = self.local.save(&applied) {
            warn!(error = %e, source, "local persist of adopted state failed");
        }
        self.state_tx.send_replace(applied);
        debug!(source, watermark = self.watermark, walls = self.images.len(), "adopted newer wall state");
        true
    }

    // -------------------------------------------------------------------------
    // Event loop
    // -------------------------------------------------------------------------

    async fn handle(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Edit(edit) => {
                self.apply(edit).await;
            }
            SyncCommand::Upload { wall, bytes, mime, panel } => {
                if let Err(e) = self.upload_image(wall, &bytes, &mime, panel).await {
                    warn!(error = %e, %wall, "upload failed");
                }
            }
            SyncCommand::PullNow => {
                self.pull_remote().await;
            }
        }
    }

    /// Drive the orchestrator until every [`SyncHandle`] is dropped. Remaining
    /// temporary handles are released when the loop ends.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SyncCommand>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tabs_open = true;

        info!(
            poll_ms = u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            watermark = self.watermark,
            "wall sync started"
        );

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle(command).await;
                }
                _ = ticker.tick() => {
                    self.pull_remote().await;
                }
                payload = self.tabs.next(), if tabs_open => {
                    match payload {
                        Some(payload) => {
                            self.receive_tab(&payload);
                        }
                        None => {
                            debug!("tab channel closed");
                            tabs_open = false;
                        }
                    }
                }
            }
        }

        info!(released = self.blobs.live_count(), "wall sync stopped");
    }
}

impl<L, R, T> WallSync<L, R, T>
where
    L: LocalStore + 'static,
    R: RemoteStore + 'static,
    T: TabChannel + 'static,
{
    /// Spawn [`Self::run`] on the current runtime.
    #[must_use]
    pub fn spawn(self) -> SyncTask {
        let (handle, commands) = SyncHandle::channel(DEFAULT_COMMAND_QUEUE_CAPACITY);
        let state = self.subscribe();
        let join = tokio::spawn(self.run(commands));
        SyncTask { handle, state, join }
    }
}

/// A running orchestrator.
#[derive(Debug)]
pub struct SyncTask {
    pub handle: SyncHandle,
    pub state: watch::Receiver<SyncedRecord>,
    pub join: JoinHandle<()>,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable context handle for views that edit wall state.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn send(&self, command: SyncCommand) -> Result<(), SyncStopped> {
        self.tx.send(command).await.map_err(|_| SyncStopped)
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn set_image(&self, wall: WallId, src: impl Into<String>, panel: Option<PanelSize>) -> Result<(), SyncStopped> {
        self.send(SyncCommand::Edit(Edit::SetImage { wall, src: src.into(), panel })).await
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn update_transform(
        &self,
        wall: WallId,
        patch: TransformPatch,
        panel: Option<PanelSize>,
    ) -> Result<(), SyncStopped> {
        self.send(SyncCommand::Edit(Edit::UpdateTransform { wall, patch, panel })).await
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn reset_transform(&self, wall: WallId) -> Result<(), SyncStopped> {
        self.send(SyncCommand::Edit(Edit::ResetTransform { wall })).await
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn clear_image(&self, wall: WallId) -> Result<(), SyncStopped> {
        self.send(SyncCommand::Edit(Edit::ClearImage { wall })).await
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn upload(&self, wall: WallId, bytes: Vec<u8>, mime: impl Into<String>, panel: Option<PanelSize>) -> Result<(), SyncStopped> {
        self.send(SyncCommand::Upload { wall, bytes, mime: mime.into(), panel }).await
    }

    /// # Errors
    ///
    /// Returns [`SyncStopped`] if the loop is no longer running.
    pub async fn pull_now(&self) -> Result<(), SyncStopped> {
        self.send(SyncCommand::PullNow).await
    }
}
