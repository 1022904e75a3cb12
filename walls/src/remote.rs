//! Remote store adapter.
//!
//! DESIGN
//! ======
//! The remote store holds one record guarded by its timestamp. Writers do
//! not compare-and-swap: the orchestrator decides to push based on its own
//! last-read watermark, and the store applies a push only when it is
//! strictly newer than what it holds. Two writers racing on a stale read is
//! tolerated; the loser's imagery is corrected by the next poll.
//!
//! ERROR HANDLING
//! ==============
//! Every failure surfaces as `RemoteError` so callers can log it, but the
//! orchestrator never propagates it: a missed push or poll self-heals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::codec::timestamp;
use crate::model::SyncedRecord;
use crate::sanitize::sanitize_images;

#[cfg(test)]
#[path = "remote_test.rs"]
mod tests;

pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store returned HTTP {0}")]
    Status(u16),
    #[error("remote store unavailable")]
    Unavailable,
}

/// Shared backend holding the single synced record.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the current record. `Ok(None)` when the store holds nothing usable.
    async fn load(&self) -> Result<Option<SyncedRecord>, RemoteError>;

    /// Offer a record. Returns whether the store applied it.
    async fn save(&self, record: &SyncedRecord) -> Result<bool, RemoteError>;
}

/// Interpret a fetched body. A body without a numeric `updatedAt` is unusable.
#[must_use]
pub fn record_from_body(body: &Value) -> Option<SyncedRecord> {
    let updated_at = body.get("updatedAt").and_then(timestamp)?;
    let images = body.get("images").map(sanitize_images).unwrap_or_default();
    Some(SyncedRecord { images, updated_at })
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Debug, Deserialize)]
struct SaveAck {
    #[serde(default)]
    applied: bool,
}

/// Remote store served by `GET`/`POST {base}/api/wall-state`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    url: String,
}

impl HttpRemote {
    /// Build a client for `base_url` (scheme and host, optional path prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base = base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RemoteError::InvalidBaseUrl(base_url.to_owned()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: format!("{base}{}", crate::WALL_STATE_PATH) })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn load(&self) -> Result<Option<SyncedRecord>, RemoteError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let body = response.json::<Value>().await?;
        Ok(record_from_body(&body))
    }

    async fn save(&self, record: &SyncedRecord) -> Result<bool, RemoteError> {
        let response = self.client.post(&self.url).json(record).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let ack = response.json::<SaveAck>().await?;
        Ok(ack.applied)
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process remote store. Clones share the slot and the failure switch.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    slot: Arc<Mutex<SyncedRecord>>,
    offline: Arc<AtomicBool>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_record(record: SyncedRecord) -> Self {
        Self { slot: Arc::new(Mutex::new(record)), offline: Arc::default() }
    }

    /// Make every call fail with `RemoteError::Unavailable` until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current stored record, bypassing the failure switch.
    #[must_use]
    pub fn snapshot(&self) -> SyncedRecord {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Overwrite the stored record regardless of its timestamp.
    pub fn force(&self, record: SyncedRecord) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = record;
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) { Err(RemoteError::Unavailable) } else { Ok(()) }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn load(&self) -> Result<Option<SyncedRecord>, RemoteError> {
        self.check_online()?;
        Ok(Some(self.snapshot()))
    }

    async fn save(&self, record: &SyncedRecord) -> Result<bool, RemoteError> {
        self.check_online()?;
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.replace_if_newer(record.clone()))
    }
}
