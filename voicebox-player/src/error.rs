//! Error types for voicebox-player
//!
//! Every user-facing failure is a typed variant; the chat layer decides how to
//! word it. Nothing here is swallowed except the documented retry cap, which is
//! reported through `GuildEvent::PlaybackStalled` instead.

use thiserror::Error;

/// Why a play request produced nothing to enqueue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// Resolver found nothing for the link or query
    #[error("No results for '{query}'")]
    NoMatch { query: String },

    /// Selection reply was not a number in range
    #[error("Illegal input '{input}', search session terminated")]
    IllegalSelection { input: String },

    /// Requester did not pick a result in time
    #[error("No selection made in time, search session terminated")]
    SelectionTimeout,

    /// Resolver failed for another reason
    #[error("Resolver failed: {0}")]
    Backend(String),
}

/// Command rejected before any state was touched
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("You need to be in a voice channel to use this command")]
    NotInVoiceChannel,

    #[error("Nothing to play was given")]
    EmptyInput,

    #[error("You don't have the privilege to change this setting")]
    InsufficientPermission,
}

/// Main error type for voicebox-player
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Request aborted during resolution
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    /// Next item is still downloading; retry shortly
    #[error("'{title}' is not ready to be played just yet, please be patient")]
    NotReady { title: String },

    /// Audio engine reported a playback error
    #[error("Playback error: {0}")]
    Playback(String),

    /// Command rejected up front
    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// Command needs an active voice connection
    #[error("I am not in any voice chat right now")]
    NotConnected,

    /// Command needs a current song
    #[error("Nothing is playing right now")]
    NothingPlaying,

    /// Plain `loop` while a counted loop is active; reissue to cancel
    #[error("Already looping {remaining} more times, reissue the command to cancel")]
    AlreadyLooping { remaining: u32 },

    /// `loop 0`
    #[error("Loop count must be at least 1")]
    InvalidLoopCount,

    /// Audio engine plumbing failure (connect, disconnect, play)
    #[error("Audio engine error: {0}")]
    Audio(String),

    /// Download failure
    #[error("Download error: {0}")]
    Download(String),

    /// Settings database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// True for conditions the user can simply retry in a moment
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayerError::NotReady { .. })
    }
}

impl From<voicebox_common::Error> for PlayerError {
    fn from(err: voicebox_common::Error) -> Self {
        match err {
            voicebox_common::Error::Io(e) => PlayerError::Io(e),
            voicebox_common::Error::Config(msg) => PlayerError::Config(msg),
            other => PlayerError::Internal(other.to_string()),
        }
    }
}

/// Convenience Result type using PlayerError
pub type Result<T> = std::result::Result<T, PlayerError>;
