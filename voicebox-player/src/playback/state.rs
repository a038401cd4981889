//! Playback state as reported to callers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a guild's player is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PlaybackState {
    /// Nothing playing (never started, finished, stopped, or stalled)
    #[default]
    Idle,
    Playing,
    Paused,
    /// Playing with a loop active
    Looping,
    /// Re-queued after an engine error, restarting
    Retrying,
}

impl PlaybackState {
    /// Playing in any form
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackState::Playing | PlaybackState::Looping | PlaybackState::Retrying
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::Paused => write!(f, "Paused"),
            PlaybackState::Looping => write!(f, "Looping"),
            PlaybackState::Retrying => write!(f, "Retrying"),
        }
    }
}
