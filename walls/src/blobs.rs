//! Uploaded image references.
//!
//! Small uploads are inlined as `data:` URIs and need no cleanup. Large ones
//! are written to a scratch directory and referenced by a `blob:<uuid>`
//! handle that this process owns. Handles must be released when superseded
//! or cleared, and whatever is still live is released when the registry is
//! dropped; otherwise scratch files pile up for the whole session.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(test)]
#[path = "blobs_test.rs"]
mod tests;

pub const BLOB_PREFIX: &str = "blob:";

/// Uploads at or below this size are inlined.
pub const DEFAULT_INLINE_LIMIT_BYTES: usize = 512 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
#[must_use]
pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Guess an image MIME type from a file extension.
#[must_use]
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[must_use]
pub fn is_blob_ref(src: &str) -> bool {
    src.starts_with(BLOB_PREFIX)
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Owner of this process's temporary image handles.
#[derive(Debug)]
pub struct BlobRegistry {
    dir: PathBuf,
    live: HashSet<String>,
}

impl BlobRegistry {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), live: HashSet::new() }
    }

    /// Registry under the system temp directory.
    #[must_use]
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("wallsync-blobs"))
    }

    /// Write `bytes` to a new handle and start tracking it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scratch file cannot be written.
    pub fn allocate(&mut self, bytes: &[u8]) -> Result<String, BlobError> {
        let id = Uuid::new_v4();
        let path = self.dir.join(id.to_string());
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&path, bytes))
            .map_err(|source| BlobError::Write { path: path.clone(), source })?;
        let handle = format!("{BLOB_PREFIX}{id}");
        self.live.insert(handle.clone());
        debug!(%handle, size = bytes.len(), "blob allocated");
        Ok(handle)
    }

    /// Start tracking `src` if it is a handle. Other references are ignored.
    pub fn track(&mut self, src: &str) {
        if is_blob_ref(src) {
            self.live.insert(src.to_owned());
        }
    }

    /// Release a tracked handle. Returns whether anything was released.
    pub fn release(&mut self, src: &str) -> bool {
        if !self.live.remove(src) {
            return false;
        }
        self.remove_file(src);
        true
    }

    /// Release every live handle.
    pub fn release_all(&mut self) {
        for handle in std::mem::take(&mut self.live) {
            self.remove_file(&handle);
        }
    }

    /// Scratch file backing a live handle.
    #[must_use]
    pub fn resolve(&self, src: &str) -> Option<PathBuf> {
        if !self.live.contains(src) {
            return None;
        }
        src.strip_prefix(BLOB_PREFIX).map(|id| self.dir.join(id))
    }

    #[must_use]
    pub fn is_live(&self, src: &str) -> bool {
        self.live.contains(src)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn remove_file(&self, handle: &str) {
        let Some(id) = handle.strip_prefix(BLOB_PREFIX) else {
            return;
        };
        // Handles minted elsewhere may name files we never wrote.
        if id.contains(['/', '\\']) || id.contains("..") {
            return;
        }
        let path = self.dir.join(id);
        match fs::remove_file(&path) {
            Ok(()) => debug!(%handle, "blob released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, %handle, "blob release failed"),
        }
    }
}

impl Drop for BlobRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
