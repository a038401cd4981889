//! Core playback engine - track lifecycle
//!
//! **Responsibilities:**
//! - PlaybackEngine struct and guild lookup
//! - Starting the current song (handle acquisition, audio engine `play`)
//! - Completion watching and the completion-driven transitions
//! - Retry on engine errors, bounded by `max_retry`
//! - Advance logic shared by completions, `skip` and the prefetch task
//!
//! Every method here runs with the guild's session lock held by the caller, so
//! a transition is never interleaved with another transition of the same guild.

use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use voicebox_common::events::{GuildEvent, LoopStatus};
use voicebox_common::{ChannelId, GuildId, MediaReference, TrackSource};

use crate::backends::{TrackCompletion, TrackOutcome};
use crate::error::{PlayerError, Result};
use crate::playback::PlaybackState;
use crate::session::{GuildSession, LoopMode, PlayerAcquisition};
use crate::state::{GuildEntry, SharedState};

/// Result of `play_song`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The head of the queue started playing
    Started,
    /// Something is already playing (or paused); the new items simply wait
    AlreadyPlaying,
    /// Nothing queued
    QueueEmpty,
    /// The head is a deferred item still downloading; the prefetch task starts
    /// it once the file lands
    WaitingOnDownload,
}

/// Result of an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A loop replayed the current song
    Replayed,
    /// The next queued song started
    Advanced,
    /// Queue ran dry; disconnected
    Finished,
}

/// Per-guild playback state machine driver
///
/// Stateless apart from the shared state; all guild state lives in the
/// `GuildSession`. Cheap to clone into completion watchers.
#[derive(Clone)]
pub struct PlaybackEngine {
    pub(super) shared: Arc<SharedState>,
}

impl PlaybackEngine {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Entry of a guild that must already have a session
    pub(super) async fn known_guild(&self, guild_id: GuildId) -> Result<Arc<GuildEntry>> {
        self.shared
            .existing_guild(guild_id)
            .await
            .ok_or(PlayerError::NotConnected)
    }

    pub(crate) fn emit(&self, event: GuildEvent) {
        self.shared.emit(event);
    }

    /// Connect to `channel` unless the guild already has a voice connection
    pub(crate) async fn ensure_connected(
        &self,
        session: &mut GuildSession,
        channel: ChannelId,
    ) -> Result<()> {
        let guild_id = session.guild_id;
        if !self.shared.backends.audio.is_connected(guild_id) {
            info!(guild_id = %guild_id, channel_id = %channel, "Connecting to voice channel");
            self.shared
                .backends
                .audio
                .connect(guild_id, channel)
                .await
                .map_err(|e| PlayerError::Audio(e.to_string()))?;
        }
        session.voice_channel = Some(channel);
        Ok(())
    }

    /// Whether `media` can be played right now
    ///
    /// Streamed items always can; deferred items only once their local copy
    /// is complete.
    pub(crate) async fn is_ready(
        &self,
        session: &GuildSession,
        media: &MediaReference,
    ) -> Result<bool> {
        if !session.is_deferred(media) {
            return Ok(true);
        }
        let downloader = Arc::clone(&self.shared.backends.downloader);
        let item = media.clone();
        self.shared.run_blocking(move || downloader.exists(&item)).await
    }

    /// Start the head of the queue if the guild is idle
    pub(crate) async fn play_song(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
    ) -> Result<PlayOutcome> {
        let guild_id = session.guild_id;

        if session.state.is_active() || session.state == PlaybackState::Paused {
            debug!(
                guild_id = %guild_id,
                state = %session.state,
                "Already playing, new items wait in queue"
            );
            return Ok(PlayOutcome::AlreadyPlaying);
        }

        let Some(next) = session.queue.pop_front() else {
            return Ok(PlayOutcome::QueueEmpty);
        };

        if !self.is_ready(session, &next).await? {
            info!(
                guild_id = %guild_id,
                "'{}' is still downloading, playback will start when it lands",
                next.title
            );
            session.queue.push_front(next);
            session.awaiting_download = true;
            return Ok(PlayOutcome::WaitingOnDownload);
        }

        // A stalled or awaited song still sits in current_song; it is done
        if let Some(stale) = session.current_song.take() {
            session.previous_song = Some(stale);
        }
        session.current_song = Some(next);
        session.retry_count = 0;
        session.awaiting_download = false;

        self.start_with_retries(entry, session, PlayerAcquisition::ReuseIfPresent)
            .await?;
        Ok(PlayOutcome::Started)
    }

    /// Move on after the current song ended (or was skipped)
    ///
    /// Honors the loop mode: an infinite loop replays forever, a bounded loop
    /// replays until its count is used up and then advances. On a deferred
    /// item that is not on disk yet the session is restored and `NotReady` is
    /// returned without changing state.
    pub(crate) async fn advance(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
    ) -> Result<AdvanceOutcome> {
        let guild_id = session.guild_id;

        match session.loop_mode.clone() {
            LoopMode::Infinite if session.current_song.is_some() => {
                debug!(guild_id = %guild_id, "Infinite loop, replaying");
                self.replay(entry, session).await?;
                return Ok(AdvanceOutcome::Replayed);
            }
            LoopMode::Bounded {
                remaining,
                target,
                cancel_armed,
            } if remaining > 0 => {
                debug!(
                    guild_id = %guild_id,
                    remaining = remaining - 1,
                    "Bounded loop, replaying '{}'",
                    target.title
                );
                session.loop_mode = LoopMode::Bounded {
                    remaining: remaining - 1,
                    target: target.clone(),
                    cancel_armed,
                };
                session.current_song = Some(target);
                self.replay(entry, session).await?;
                return Ok(AdvanceOutcome::Replayed);
            }
            LoopMode::Bounded { .. } => {
                info!(guild_id = %guild_id, "Bounded loop finished");
                session.loop_mode = LoopMode::None;
                self.emit(GuildEvent::LoopChanged {
                    guild_id,
                    status: LoopStatus::Off,
                    timestamp: Utc::now(),
                });
            }
            _ => {}
        }

        let Some(next) = session.queue.pop_front() else {
            self.finish(session).await;
            return Ok(AdvanceOutcome::Finished);
        };

        if !self.is_ready(session, &next).await? {
            info!(guild_id = %guild_id, "'{}' is not downloaded yet, not advancing", next.title);
            let title = next.title.clone();
            session.queue.push_front(next);
            return Err(PlayerError::NotReady { title });
        }

        session.previous_song = session.current_song.take();
        session.current_song = Some(next);
        session.retry_count = 0;
        session.awaiting_download = false;

        self.start_with_retries(entry, session, PlayerAcquisition::ForceRefresh)
            .await?;
        Ok(AdvanceOutcome::Advanced)
    }

    async fn replay(&self, entry: &Arc<GuildEntry>, session: &mut GuildSession) -> Result<()> {
        match self.start_current(entry, session, PlayerAcquisition::ForceRefresh, true).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                if self.requeue_for_retry(session, &message) {
                    self.restart_from_head(entry, session).await
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Queue ran dry: release the voice connection and go idle
    async fn finish(&self, session: &mut GuildSession) {
        let guild_id = session.guild_id;
        info!(guild_id = %guild_id, "Finished playing, queue is empty");

        session.next_generation();
        session.previous_song = session.current_song.take();
        session.player_handle = None;
        session.retry_count = 0;
        session.state = PlaybackState::Idle;
        session.voice_channel = None;

        if let Err(e) = self.shared.backends.audio.disconnect(guild_id).await {
            warn!(guild_id = %guild_id, "Disconnect after queue end failed: {}", e);
        }

        self.emit(GuildEvent::QueueFinished {
            guild_id,
            timestamp: Utc::now(),
        });
    }

    /// Start `current_song`, retrying engine errors up to the cap
    ///
    /// Each failed start re-queues the song and takes it from the head again,
    /// so the loop mirrors a completion-driven retry exactly.
    async fn start_with_retries(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
        mut mode: PlayerAcquisition,
    ) -> Result<()> {
        loop {
            match self.start_current(entry, session, mode, false).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let message = e.to_string();
                    if !self.requeue_for_retry(session, &message) {
                        return Err(e);
                    }
                    session.current_song = session.queue.pop_front();
                    mode = PlayerAcquisition::ForceRefresh;
                }
            }
        }
    }

    async fn restart_from_head(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
    ) -> Result<()> {
        session.current_song = session.queue.pop_front();
        self.start_with_retries(entry, session, PlayerAcquisition::ForceRefresh)
            .await
    }

    /// Hand `current_song` to the audio engine and watch for its completion
    async fn start_current(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
        mode: PlayerAcquisition,
        replay: bool,
    ) -> Result<()> {
        let guild_id = session.guild_id;
        let media = session
            .current_song
            .clone()
            .ok_or(PlayerError::NothingPlaying)?;

        let source = if session.is_deferred(&media) {
            TrackSource::Local(self.shared.backends.downloader.local_path(&media))
        } else {
            TrackSource::Stream(media.stream_url.clone())
        };

        let handle = session
            .acquire_handle(mode, source)
            .ok_or(PlayerError::NothingPlaying)?;
        let generation = session.next_generation();

        let completion = self
            .shared
            .backends
            .audio
            .play(guild_id, &handle)
            .await
            .map_err(|e| PlayerError::Playback(e.to_string()))?;

        session.state = session.audible_state();
        let source_kind = if handle.source.is_local() { "local" } else { "stream" };
        info!(
            guild_id = %guild_id,
            generation,
            source = source_kind,
            "Now playing '{}' [{}]",
            media.title,
            media.display_duration()
        );

        tokio::spawn(self.clone().track_watcher(Arc::clone(entry), generation, completion));

        self.emit(GuildEvent::NowPlaying {
            guild_id,
            media,
            replay,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Put the current song back at the head of the queue for another attempt
    ///
    /// Returns false once the guild has used up its retries. In that case the
    /// guild is left idle with the song still current and nothing advances on
    /// its own until a user skips or submits more work.
    fn requeue_for_retry(&self, session: &mut GuildSession, message: &str) -> bool {
        let guild_id = session.guild_id;
        let max_retry = self.shared.settings.max_retry;

        if session.retry_count >= max_retry {
            error!(
                guild_id = %guild_id,
                retries = session.retry_count,
                "Playback of {:?} failed after max retries, giving up: {}",
                session.current_song.as_ref().map(|m| m.title.as_str()),
                message
            );
            session.state = PlaybackState::Idle;
            session.player_handle = None;
            self.emit(GuildEvent::PlaybackStalled {
                guild_id,
                media: session.current_song.clone(),
                error: message.to_string(),
                timestamp: Utc::now(),
            });
            return false;
        }

        let Some(media) = session.current_song.take() else {
            return false;
        };

        session.retry_count += 1;
        warn!(
            guild_id = %guild_id,
            attempt = session.retry_count,
            max_retry,
            "Playback of '{}' failed, retrying: {}",
            media.title,
            message
        );

        session.state = PlaybackState::Retrying;
        session.queue.push_front(media.clone());
        self.emit(GuildEvent::PlaybackRetry {
            guild_id,
            media,
            attempt: session.retry_count,
            max_attempts: max_retry,
            error: message.to_string(),
            timestamp: Utc::now(),
        });
        true
    }

    /// Await one track's completion signal, then feed it back into the engine
    ///
    /// Boxed so the completion path can start the next track (and spawn the
    /// next watcher) without a self-referential future type.
    fn track_watcher(
        self,
        entry: Arc<GuildEntry>,
        generation: u64,
        completion: TrackCompletion,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            match completion.await {
                Ok(outcome) => self.on_track_end(&entry, generation, outcome).await,
                Err(_) => debug!(
                    guild_id = %entry.guild_id,
                    generation,
                    "Track superseded before it completed"
                ),
            }
        })
    }

    /// Completion callback
    pub(crate) async fn on_track_end(
        &self,
        entry: &Arc<GuildEntry>,
        generation: u64,
        outcome: TrackOutcome,
    ) {
        let mut session = entry.session.lock().await;
        let guild_id = session.guild_id;

        if session.generation != generation {
            debug!(
                guild_id = %guild_id,
                generation,
                current = session.generation,
                "Ignoring completion of a superseded track"
            );
            return;
        }

        match outcome {
            TrackOutcome::Finished => {
                session.retry_count = 0;
                match self.advance(entry, &mut session).await {
                    Ok(outcome) => {
                        debug!(guild_id = %guild_id, ?outcome, "Advanced after completion")
                    }
                    Err(PlayerError::NotReady { .. }) => {
                        // Nothing audible until the prefetch task lands the file
                        session.awaiting_download = true;
                        session.state = PlaybackState::Idle;
                        session.player_handle = None;
                        if let Some(media) = session.queue.front().cloned() {
                            self.emit(GuildEvent::NextNotReady {
                                guild_id,
                                media,
                                timestamp: Utc::now(),
                            });
                        }
                    }
                    Err(e) => warn!(guild_id = %guild_id, "Advance after completion failed: {}", e),
                }
            }
            TrackOutcome::Failed(message) => {
                if self.requeue_for_retry(&mut session, &message) {
                    if let Err(e) = self.restart_from_head(entry, &mut session).await {
                        warn!(guild_id = %guild_id, "Retry failed: {}", e);
                    }
                }
            }
        }
    }

    /// Resume a guild that stalled on an undownloaded item
    ///
    /// Called by the prefetch task after each round. No-op unless a
    /// completion-driven advance is waiting and the awaited item is ready.
    pub(crate) async fn resume_after_download(
        &self,
        entry: &Arc<GuildEntry>,
        session: &mut GuildSession,
    ) -> Result<bool> {
        if !session.awaiting_download {
            return Ok(false);
        }
        let Some(head) = session.queue.front().cloned() else {
            session.awaiting_download = false;
            return Ok(false);
        };
        if !self.is_ready(session, &head).await? {
            return Ok(false);
        }

        info!(guild_id = %session.guild_id, "'{}' downloaded, resuming playback", head.title);
        session.awaiting_download = false;
        if session.current_song.is_some() {
            self.advance(entry, session).await?;
        } else {
            self.play_song(entry, session).await?;
        }
        Ok(true)
    }
}
