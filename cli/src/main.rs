use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use walls::blobs::{BlobError, guess_mime};
use walls::layout::{PanelGroup, Placement, fit_canvas, place};
use walls::remote::{DEFAULT_REMOTE_TIMEOUT_MS, HttpRemote, RemoteError};
use walls::store::FileStore;
use walls::sync::{Mutation, SyncConfig, WallSync};
use walls::tabs::NoTabs;
use walls::{PanelSize, SyncedRecord, TransformPatch, WallId};

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

type CliSync = WallSync<FileStore, HttpRemote, NoTabs>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("remote store: {0}")]
    Remote(#[from] RemoteError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    Upload(#[from] BlobError),
    #[error("nothing to change; pass at least one of --x, --y, --scale, --rotation")]
    EmptyPatch,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "wallsync-cli", about = "Wall image sync client")]
struct Cli {
    #[arg(long, env = "WALLSYNC_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Directory for the local record cache.
    #[arg(long, env = "WALLSYNC_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_REMOTE_TIMEOUT_MS)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    #[command(flatten)]
    Wall(WallCommand),
}

/// Commands that go through a sync client.
#[derive(Subcommand, Debug)]
enum WallCommand {
    /// Print the current shared record.
    Get,
    /// Place an image on a wall. SOURCE is a local file or a URL.
    Set {
        wall: WallId,
        source: String,
        /// Panel size the image is placed on, as WIDTHxHEIGHT.
        #[arg(long, value_parser = parse_panel)]
        panel: Option<PanelSize>,
    },
    /// Move, scale or rotate a wall's image.
    Transform {
        wall: WallId,
        #[arg(long, allow_negative_numbers = true)]
        x: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        y: Option<f64>,
        #[arg(long)]
        scale: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        rotation: Option<f64>,
        #[arg(long, value_parser = parse_panel)]
        panel: Option<PanelSize>,
    },
    /// Restore a wall's identity transform.
    Reset { wall: WallId },
    /// Remove a wall's image.
    Clear { wall: WallId },
    /// Follow the shared record, printing each new state as one JSON line.
    Watch {
        #[arg(long, default_value_t = walls::sync::DEFAULT_POLL_INTERVAL_MS)]
        interval_ms: u64,
    },
    /// Print render placements for a panel group at a viewport size.
    Render {
        #[arg(value_parser = parse_group)]
        group: PanelGroup,
        #[arg(long, default_value_t = 1920.0)]
        width: f64,
        #[arg(long, default_value_t = 1080.0)]
        height: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Wall(command) => {
            let mut sync = connect(&cli.base_url, cli.cache_dir.as_deref(), cli.timeout_ms)?;
            // Edits apply on top of the latest shared state, not a stale cache.
            sync.pull_remote().await;
            run_wall(sync, command).await
        }
    }
}

fn connect(base_url: &str, cache_dir: Option<&Path>, timeout_ms: u64) -> Result<CliSync, CliError> {
    let remote = HttpRemote::new(base_url, Duration::from_millis(timeout_ms))?;
    let cache_dir = cache_dir.map_or_else(|| std::env::temp_dir().join("wallsync-cli"), Path::to_path_buf);
    tracing::debug!(url = remote.url(), cache = %cache_dir.display(), "connecting");
    // Temporary handles die with this process, so uploads are always inlined.
    let config = SyncConfig { inline_limit_bytes: usize::MAX, ..SyncConfig::from_env() };
    Ok(WallSync::new(FileStore::in_dir(cache_dir), remote, NoTabs).with_config(config))
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_wall(mut sync: CliSync, command: WallCommand) -> Result<(), CliError> {
    let mutation = match command {
        WallCommand::Get => return print_record(&snapshot(&sync)),
        WallCommand::Watch { interval_ms } => return run_watch(sync, interval_ms).await,
        WallCommand::Render { group, width, height } => {
            return print_placements(&render(&snapshot(&sync), group, PanelSize::new(width, height)));
        }
        WallCommand::Set { wall, source, panel } => match (resolve_source(&source).await?, panel) {
            (Source::Reference(src), Some(panel)) => sync.set_image_on_panel(wall, src, panel).await,
            (Source::Reference(src), None) => sync.set_image(wall, src).await,
            (Source::File { bytes, mime }, panel) => sync.upload_image(wall, &bytes, mime, panel).await?,
        },
        WallCommand::Transform { wall, x, y, scale, rotation, panel } => {
            let patch = TransformPatch { x, y, scale, rotation };
            if patch.is_empty() {
                return Err(CliError::EmptyPatch);
            }
            match panel {
                Some(panel) => sync.update_transform_on_panel(wall, patch, panel).await,
                None => sync.update_transform(wall, patch).await,
            }
        }
        WallCommand::Reset { wall } => sync.reset_transform(wall).await,
        WallCommand::Clear { wall } => sync.clear_image(wall).await,
    };

    match mutation {
        Mutation::Committed(updated_at) => println!("committed {updated_at}"),
        Mutation::Unchanged => println!("unchanged"),
    }
    Ok(())
}

async fn run_watch(sync: CliSync, interval_ms: u64) -> Result<(), CliError> {
    let config = SyncConfig { poll_interval: Duration::from_millis(interval_ms.max(1)), ..SyncConfig::from_env() };
    let task = sync.with_config(config).spawn();
    let mut state = task.state;

    print_line(&state.borrow_and_update())?;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                print_line(&state.borrow_and_update())?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(task.handle);
    if let Err(e) = task.join.await {
        tracing::warn!(error = %e, "sync task ended abnormally");
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Debug, PartialEq)]
enum Source {
    /// URL or other reference stored as-is.
    Reference(String),
    /// Local file to upload.
    File { bytes: Vec<u8>, mime: &'static str },
}

async fn resolve_source(source: &str) -> Result<Source, CliError> {
    let path = Path::new(source);
    if source.contains("://") || source.starts_with("data:") || !path.is_file() {
        return Ok(Source::Reference(source.to_owned()));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    Ok(Source::File { bytes, mime: guess_mime(path) })
}

fn snapshot(sync: &CliSync) -> SyncedRecord {
    SyncedRecord::new(sync.images().clone(), sync.watermark())
}

fn render(record: &SyncedRecord, group: PanelGroup, viewport: PanelSize) -> Vec<Placement> {
    let canvas = group.canvas();
    let container = fit_canvas(canvas, viewport);
    group
        .walls()
        .iter()
        .map(|rect| place(record.images.get(&rect.id), rect, canvas, container, None))
        .collect()
}

fn parse_panel(raw: &str) -> Result<PanelSize, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let width = w.trim().parse::<f64>().map_err(|e| format!("bad width `{w}`: {e}"))?;
    let height = h.trim().parse::<f64>().map_err(|e| format!("bad height `{h}`: {e}"))?;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(format!("panel size must be positive, got `{raw}`"));
    }
    Ok(PanelSize::new(width, height))
}

fn parse_group(raw: &str) -> Result<PanelGroup, String> {
    PanelGroup::parse(raw).ok_or_else(|| format!("unknown panel group `{raw}`; expected w13 or w245"))
}

fn print_record(record: &SyncedRecord) -> Result<(), CliError> {
    print_json(&serde_json::to_value(record)?)
}

fn print_placements(placements: &[Placement]) -> Result<(), CliError> {
    print_json(&serde_json::to_value(placements)?)
}

fn print_line(record: &SyncedRecord) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
