//! Configuration loading and storage folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every key has a compiled
//! default, so a missing file is a warning and never stops the bot.
//!
//! File resolution priority:
//! 1. Explicit path passed by the embedding bot
//! 2. `VOICEBOX_CONFIG` environment variable
//! 3. `<config dir>/voicebox/config.toml`
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VOICEBOX_CONFIG";

/// Extension used for downloaded media files
pub const MEDIA_FILE_EXTENSION: &str = "mp3";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder deferred items are downloaded into
    pub storage_dir: PathBuf,

    /// SQLite file for per-guild settings (in-memory store if absent)
    pub database_path: Option<PathBuf>,

    /// Validity window of a direct streaming link, in seconds
    pub stream_lifetime_cap_secs: u64,

    /// Background download tick, in seconds
    pub prefetch_interval_secs: u64,

    /// How long a requester has to pick a search result, in seconds
    pub selection_timeout_secs: u64,

    /// Number of search results offered for selection
    pub search_candidates: usize,

    /// Playback error retries before giving up on an item
    pub max_retry: u32,

    /// Waiting this long on a resolution emits a one-off "be patient" event
    pub slow_resolution_notice_secs: u64,

    /// EventBus buffer size
    pub event_capacity: usize,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            database_path: None,
            stream_lifetime_cap_secs: 21_600,
            prefetch_interval_secs: 20,
            selection_timeout_secs: 30,
            search_candidates: 5,
            max_retry: 3,
            slow_resolution_notice_secs: 5,
            event_capacity: 256,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration following the resolution priority
    ///
    /// A malformed file is an error; a missing one falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = locate_config_file(explicit) else {
            warn!("No configuration file found, using compiled defaults");
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Configuration file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.stream_lifetime_cap_secs == 0 {
            return Err(Error::Config(
                "stream_lifetime_cap_secs must be greater than zero".to_string(),
            ));
        }
        if self.search_candidates == 0 {
            return Err(Error::Config(
                "search_candidates must be at least 1".to_string(),
            ));
        }
        if self.prefetch_interval_secs == 0 {
            return Err(Error::Config(
                "prefetch_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir()?.join("voicebox").join("config.toml");
    user_config.exists().then_some(user_config)
}

/// OS-dependent default storage folder
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("voicebox"))
        .unwrap_or_else(|| PathBuf::from("./voicebox_data"))
}

/// Create the storage folder and purge media left over from a previous run
///
/// Returns the number of stale files removed. Files with other extensions are
/// left alone.
pub fn prepare_storage_dir(dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_media = path
            .extension()
            .map(|ext| ext == MEDIA_FILE_EXTENSION)
            .unwrap_or(false);

        if is_media && path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed stale media file {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    if removed > 0 {
        info!("Purged {} stale media files from {}", removed, dir.display());
    }
    Ok(removed)
}

/// Local file a media id is downloaded to
pub fn media_file_path(storage_dir: &Path, media_id: &str) -> PathBuf {
    storage_dir.join(format!("{}.{}", media_id, MEDIA_FILE_EXTENSION))
}
