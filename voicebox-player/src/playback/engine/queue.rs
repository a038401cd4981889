//! Queue operations module
//!
//! **Responsibilities:**
//! - Skipping (`skip`, `force_skip`)
//! - Queue mutations (`clear`, `shuffle`)
//! - Loop mode changes
//! - Queue snapshot for display

use chrono::Utc;
use tracing::{debug, info};
use voicebox_common::events::{GuildEvent, LoopStatus};
use voicebox_common::GuildId;

use super::core::{AdvanceOutcome, PlaybackEngine};
use crate::error::{PlayerError, Result};
use crate::playback::PlaybackState;
use crate::session::{GuildSession, LoopMode, QueueView, ShuffleOutcome};

impl PlaybackEngine {
    /// Skip the current song
    ///
    /// A plain skip behaves like a normal completion, so an active loop
    /// replays the same song. `force` clears the loop first and always moves
    /// to the next queued item. If that item is still downloading the current
    /// song plays on (resuming it if it was paused) and `NotReady` is returned.
    ///
    /// A skip is a fresh start, so the retry budget is reset before a loop
    /// replays the current song.
    pub async fn skip(&self, guild_id: GuildId, force: bool) -> Result<AdvanceOutcome> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;
        let audio = &self.shared.backends.audio;

        if !audio.is_connected(guild_id) {
            return Err(PlayerError::NotConnected);
        }
        if session.current_song.is_none() && session.queue.is_empty() {
            return Err(PlayerError::NothingPlaying);
        }

        if force && session.loop_mode.is_active() {
            info!(guild_id = %guild_id, "Force skip, clearing loop");
            self.clear_loop(&mut session);
        }

        session.retry_count = 0;
        audio.pause(guild_id);
        match self.advance(&entry, &mut session).await {
            Ok(outcome) => {
                info!(guild_id = %guild_id, force, ?outcome, "Skipped");
                Ok(outcome)
            }
            Err(e @ PlayerError::NotReady { .. }) => {
                audio.resume(guild_id);
                if session.state == PlaybackState::Paused {
                    session.state = session.audible_state();
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop every queued item; the current song keeps playing
    ///
    /// Returns how many items were removed.
    pub async fn clear(&self, guild_id: GuildId) -> Result<usize> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;

        let removed = session.queue.len();
        session.queue.clear();
        session.awaiting_download = false;
        info!(guild_id = %guild_id, removed, "Queue cleared");
        Ok(removed)
    }

    pub async fn shuffle(&self, guild_id: GuildId) -> Result<ShuffleOutcome> {
        let entry = self.shared.guild(guild_id).await;
        let mut session = entry.session.lock().await;
        let outcome = session.shuffle();
        debug!(guild_id = %guild_id, ?outcome, "Shuffle");
        Ok(outcome)
    }

    /// Change the loop mode
    ///
    /// - `None` toggles an infinite loop. While a counted loop runs, the first
    ///   plain `loop` is refused with `AlreadyLooping` and the next one cancels.
    /// - `Some(n)` replays the current song `n` more times, replacing any loop.
    pub async fn set_loop(&self, guild_id: GuildId, count: Option<u32>) -> Result<LoopStatus> {
        let entry = self.known_guild(guild_id).await?;
        let mut session = entry.session.lock().await;

        let Some(current) = session.current_song.clone() else {
            return Err(PlayerError::NothingPlaying);
        };

        let next = match (count, &mut session.loop_mode) {
            (Some(0), _) => return Err(PlayerError::InvalidLoopCount),
            (Some(n), _) => LoopMode::Bounded {
                remaining: n,
                target: current,
                cancel_armed: false,
            },
            (None, LoopMode::None) => LoopMode::Infinite,
            (None, LoopMode::Infinite) => LoopMode::None,
            (
                None,
                LoopMode::Bounded {
                    remaining,
                    cancel_armed,
                    ..
                },
            ) => {
                if !*cancel_armed {
                    *cancel_armed = true;
                    return Err(PlayerError::AlreadyLooping {
                        remaining: *remaining,
                    });
                }
                LoopMode::None
            }
        };

        session.loop_mode = next;
        if session.state.is_active() {
            session.state = session.audible_state();
        }

        let status = session.loop_mode.status();
        info!(guild_id = %guild_id, ?status, "Loop mode changed");
        self.emit(GuildEvent::LoopChanged {
            guild_id,
            status,
            timestamp: Utc::now(),
        });
        Ok(status)
    }

    pub(super) fn clear_loop(&self, session: &mut GuildSession) {
        session.loop_mode = LoopMode::None;
        if session.state.is_active() {
            session.state = session.audible_state();
        }
        self.emit(GuildEvent::LoopChanged {
            guild_id: session.guild_id,
            status: LoopStatus::Off,
            timestamp: Utc::now(),
        });
    }

    pub async fn queue_view(&self, guild_id: GuildId) -> QueueView {
        let entry = self.shared.guild(guild_id).await;
        let session = entry.session.lock().await;
        session.view()
    }
}
