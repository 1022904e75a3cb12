//! Server configuration from environment variables.

use std::path::PathBuf;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SNAPSHOT_FLUSH_MS: u64 = 1_000;
/// Room for several walls of inlined data-URI images in one POST.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Directory holding the snapshot file. `None` keeps state in memory only.
    pub snapshot_dir: Option<PathBuf>,
    /// Period of the snapshot flush task.
    pub snapshot_flush_ms: u64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Config {
    /// Read `PORT`, `WALL_STATE_DIR`, `SNAPSHOT_FLUSH_MS` and
    /// `MAX_BODY_BYTES`.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let snapshot_dir = std::env::var("WALL_STATE_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        Ok(Self {
            port,
            snapshot_dir,
            snapshot_flush_ms: env_parse("SNAPSHOT_FLUSH_MS", DEFAULT_SNAPSHOT_FLUSH_MS).max(1),
            max_body_bytes: env_parse("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES).max(1),
        })
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
