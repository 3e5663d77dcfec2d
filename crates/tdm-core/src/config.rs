use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Worker count used when the config asks for zero workers.
pub const DEFAULT_WORKERS: usize = 4;
/// Upper bound on concurrent downloads; larger values are clamped.
pub const MAX_WORKERS: usize = 10;
/// Queue capacity, large enough for big playlists.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Download queue configuration loaded from `~/.config/tdm/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent download workers (clamped to 1..=10).
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum number of jobs waiting in the queue before `enqueue` blocks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl QueueConfig {
    /// Config with the given worker count and default capacity.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Worker count actually spawned: 0 falls back to the default, anything above
    /// `MAX_WORKERS` is clamped.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => DEFAULT_WORKERS,
            n => n.min(MAX_WORKERS),
        }
    }

    /// Queue capacity actually used (a zero-capacity channel is not allowed).
    pub fn effective_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<QueueConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = QueueConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<QueueConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: QueueConfig = toml::from_str(&data)?;
    Ok(cfg)
}
