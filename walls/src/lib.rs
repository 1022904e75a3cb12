//! Shared wall-image model and cross-client sync engine.
//!
//! This crate owns the canonical state shape used by both the sync server and
//! its clients, the sanitizer applied at every trust boundary, the storage /
//! broadcast / remote adapters, and the orchestrator that ties them together
//! under a last-writer-wins policy.
//!
//! LAYOUT
//! ======
//! - `model`: plain data (walls, transforms, records).
//! - `sanitize` + `codec`: untrusted JSON in, canonical state out.
//! - `store`, `tabs`, `remote`: the three adapters.
//! - `blobs`: temporary image handles and inline encoding.
//! - `sync`: the orchestrator.
//! - `layout`: panel geometry and gesture math for presentation consumers.

pub mod blobs;
pub mod codec;
pub mod layout;
pub mod model;
pub mod remote;
pub mod sanitize;
pub mod store;
pub mod sync;
pub mod tabs;

pub use model::{PanelSize, SyncedRecord, Transform, TransformPatch, WallEntry, WallId, WallImageState};

/// Fixed key for the locally persisted record. Also names the tab channel.
pub const STORAGE_KEY: &str = "studio3_wall_state";

/// Remote endpoint path, relative to the server base URL.
pub const WALL_STATE_PATH: &str = "/api/wall-state";
