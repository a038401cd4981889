//! Transport control and session teardown

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use voicebox_common::events::GuildEvent;
use voicebox_common::GuildId;

use super::core::PlaybackEngine;
use crate::error::{PlayerError, Result};
use crate::playback::PlaybackState;
use crate::session::LoopMode;

impl PlaybackEngine {
    /// Pause audio output; the queue is untouched
    pub async fn pause(&self, guild_id: GuildId) -> Result<PlaybackState> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;

        if !self.shared.backends.audio.is_connected(guild_id) {
            return Err(PlayerError::NotConnected);
        }
        if !session.state.is_active() {
            return Err(PlayerError::NothingPlaying);
        }

        self.shared.backends.audio.pause(guild_id);
        session.state = PlaybackState::Paused;
        info!(guild_id = %guild_id, "Paused");
        Ok(session.state)
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<PlaybackState> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;

        if !self.shared.backends.audio.is_connected(guild_id) {
            return Err(PlayerError::NotConnected);
        }
        if session.state != PlaybackState::Paused {
            return Err(PlayerError::NothingPlaying);
        }

        self.shared.backends.audio.resume(guild_id);
        session.state = session.audible_state();
        info!(guild_id = %guild_id, "Resumed");
        Ok(session.state)
    }

    /// Disconnect from voice
    ///
    /// The queue survives a stop; only `clear` empties it.
    pub async fn stop(&self, guild_id: GuildId) -> Result<()> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;

        if !self.shared.backends.audio.is_connected(guild_id) {
            return Err(PlayerError::NotConnected);
        }

        // Bump first so the completion of the torn-down track is ignored
        session.next_generation();
        self.shared
            .backends
            .audio
            .disconnect(guild_id)
            .await
            .map_err(|e| PlayerError::Audio(e.to_string()))?;

        session.previous_song = session.current_song.take();
        session.player_handle = None;
        session.loop_mode = LoopMode::None;
        session.retry_count = 0;
        session.awaiting_download = false;
        session.voice_channel = None;
        session.state = PlaybackState::Idle;

        info!(guild_id = %guild_id, queued = session.queue.len(), "Stopped, queue kept");
        Ok(())
    }

    /// Voice connection dropped: wipe the session and delete local copies of
    /// everything that was queued
    ///
    /// Returns how many files were deleted.
    pub async fn reset(&self, guild_id: GuildId) -> Result<usize> {
        let Some(entry) = self.shared.existing_guild(guild_id).await else {
            return Ok(0);
        };

        let queued = entry.session.lock().await.reset();
        info!(guild_id = %guild_id, queued = queued.len(), "Voice connection lost, session reset");

        let downloader = Arc::clone(&self.shared.backends.downloader);
        let results = self
            .shared
            .run_blocking(move || {
                queued
                    .iter()
                    .map(|item| (item.id.clone(), downloader.delete(item)))
                    .collect::<Vec<_>>()
            })
            .await?;

        let mut deleted = 0;
        for (id, result) in results {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(guild_id = %guild_id, "Failed to delete local copy of {}: {}", id, e)
                }
            }
        }

        self.emit(GuildEvent::SessionReset {
            guild_id,
            files_deleted: deleted,
            timestamp: Utc::now(),
        });
        Ok(deleted)
    }
}
