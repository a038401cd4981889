use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;
use voicebox_common::{ChannelId, GuildId, MediaReference, TrackSource};

/// Audio engine failures (connection and playback start)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AudioError(pub String);

/// How a track ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Played to the end
    Finished,
    /// Engine-reported error (decoder died, stream link expired, ...)
    Failed(String),
}

/// Completion signal for one `play` call
///
/// The engine sends exactly one outcome. If it drops the sender instead (the
/// track was replaced or the connection torn down) the orchestrator treats the
/// play as superseded and ignores it.
pub type TrackCompletion = oneshot::Receiver<TrackOutcome>;

/// Prepared audio source for the current song
///
/// Owned exclusively by one guild session. A fresh `id` means a fresh decoder
/// on the engine side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    pub id: Uuid,
    pub media: MediaReference,
    pub source: TrackSource,
}

impl PlayerHandle {
    pub fn new(media: MediaReference, source: TrackSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            media,
            source,
        }
    }
}

/// Voice connection and audio output, keyed by guild
#[async_trait]
pub trait AudioEngine: Send + Sync + 'static {
    async fn connect(&self, guild_id: GuildId, channel: ChannelId) -> Result<(), AudioError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), AudioError>;

    /// Start playing `handle`, replacing whatever the guild was playing
    async fn play(
        &self,
        guild_id: GuildId,
        handle: &PlayerHandle,
    ) -> Result<TrackCompletion, AudioError>;

    fn pause(&self, guild_id: GuildId);

    fn resume(&self, guild_id: GuildId);

    /// True while audio is actively being sent (false when paused)
    fn is_playing(&self, guild_id: GuildId) -> bool;

    fn is_connected(&self, guild_id: GuildId) -> bool;
}
