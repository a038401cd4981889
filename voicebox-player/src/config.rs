//! voicebox-player runtime settings
//!
//! Derived from the bootstrap `TomlConfig`. Timings are carried as `Duration`
//! so tests can run the whole state machine with millisecond intervals.

use std::path::PathBuf;
use std::time::Duration;

use voicebox_common::config::TomlConfig;

/// Runtime settings for the orchestrator
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// Folder deferred items are downloaded into
    pub storage_dir: PathBuf,

    /// Items at or over this duration are refused; cumulative queue time at or
    /// over it triggers download deferral
    pub stream_lifetime_cap_secs: u64,

    /// Background download tick
    pub prefetch_interval: Duration,

    /// Interactive selection wait
    pub selection_timeout: Duration,

    /// Search results offered for selection
    pub search_candidates: usize,

    /// Playback error retries per item
    pub max_retry: u32,

    /// One-off "be patient" notice threshold while waiting on a resolution
    pub slow_resolution_notice: Duration,

    /// EventBus buffer size
    pub event_capacity: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for PlayerSettings {
    fn from(config: &TomlConfig) -> Self {
        Self {
            storage_dir: config.storage_dir.clone(),
            stream_lifetime_cap_secs: config.stream_lifetime_cap_secs,
            prefetch_interval: Duration::from_secs(config.prefetch_interval_secs),
            selection_timeout: Duration::from_secs(config.selection_timeout_secs),
            search_candidates: config.search_candidates,
            max_retry: config.max_retry,
            slow_resolution_notice: Duration::from_secs(config.slow_resolution_notice_secs),
            event_capacity: config.event_capacity,
        }
    }
}
