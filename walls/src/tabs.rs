//! Same-device broadcast between views.
//!
//! A `TabBus` is the in-process stand-in for a browser broadcast channel:
//! every view joins it and gets a `TabPort`. Delivery is best effort. A slow
//! port that falls behind the bus capacity skips the missed messages, which
//! is harmless because every message carries its own timestamp and the next
//! remote poll fills any gap.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

#[cfg(test)]
#[path = "tabs_test.rs"]
mod tests;

const DEFAULT_TAB_BUS_CAPACITY: usize = 64;

/// Push channel between views on one device.
#[async_trait]
pub trait TabChannel: Send {
    /// Send a payload to every other view. Never fails.
    fn publish(&self, payload: Value);

    /// Wait for the next payload from another view. `None` once the channel
    /// can no longer deliver anything.
    async fn next(&mut self) -> Option<Value>;
}

#[derive(Debug, Clone)]
struct TabEnvelope {
    origin: Uuid,
    payload: Value,
}

// =============================================================================
// BUS
// =============================================================================

/// Named broadcast hub shared by all views of one device.
#[derive(Debug, Clone)]
pub struct TabBus {
    name: String,
    tx: broadcast::Sender<TabEnvelope>,
}

impl TabBus {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_TAB_BUS_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { name: name.into(), tx }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Join the bus as a new view.
    #[must_use]
    pub fn join(&self) -> TabPort {
        TabPort { origin: Uuid::new_v4(), name: self.name.clone(), tx: self.tx.clone(), rx: self.tx.subscribe() }
    }
}

/// One view's endpoint on a [`TabBus`]. Its own messages are not echoed back.
#[derive(Debug)]
pub struct TabPort {
    origin: Uuid,
    name: String,
    tx: broadcast::Sender<TabEnvelope>,
    rx: broadcast::Receiver<TabEnvelope>,
}

impl TabPort {
    #[must_use]
    pub fn origin(&self) -> Uuid {
        self.origin
    }
}

#[async_trait]
impl TabChannel for TabPort {
    fn publish(&self, payload: Value) {
        if self.tx.send(TabEnvelope { origin: self.origin, payload }).is_err() {
            trace!(channel = %self.name, "no other views listening");
        }
    }

    async fn next(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin == self.origin => {}
                Ok(envelope) => return Some(envelope.payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "tab port lagged; skipping messages");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// DISABLED
// =============================================================================

/// Channel for environments without same-device peers (CLI, server).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTabs;

#[async_trait]
impl TabChannel for NoTabs {
    fn publish(&self, _payload: Value) {}

    async fn next(&mut self) -> Option<Value> {
        std::future::pending().await
    }
}
