//! Media descriptors
//!
//! `MediaReference` is produced by the external resolver and is immutable once
//! created. The orchestrator only ever moves it between queues and sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::human_time::format_clock;

/// Resolved, playable media item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaReference {
    /// Provider-side identifier (also names the local download file)
    pub id: String,

    /// Display title
    pub title: String,

    /// Direct streaming URL (valid for a limited window)
    pub stream_url: String,

    /// Page URL the user would recognize
    pub original_url: String,

    /// Duration in whole seconds
    pub duration_secs: u64,
}

impl MediaReference {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        stream_url: impl Into<String>,
        original_url: impl Into<String>,
        duration_secs: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            stream_url: stream_url.into(),
            original_url: original_url.into(),
            duration_secs,
        }
    }

    /// Duration formatted as `H:MM:SS`
    pub fn display_duration(&self) -> String {
        format_clock(self.duration_secs)
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.display_duration())
    }
}

/// Where the audio engine should read a track from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum TrackSource {
    /// Stream live from the provider
    Stream(String),
    /// Play a previously downloaded file
    Local(PathBuf),
}

impl TrackSource {
    pub fn is_local(&self) -> bool {
        matches!(self, TrackSource::Local(_))
    }
}
