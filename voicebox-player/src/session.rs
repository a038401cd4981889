//! Guild session
//!
//! All mutable per-guild state lives in one `GuildSession`, guarded by one
//! async mutex (see `state::GuildEntry`). The command handler, the resolver
//! task and the audio completion watcher each lock it briefly; none of them
//! holds it across a resolution or a download.

use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tokio::task::JoinHandle;
use voicebox_common::events::LoopStatus;
use voicebox_common::{ChannelId, GuildId, MediaReference, TrackSource};

use crate::backends::PlayerHandle;
use crate::playback::PlaybackState;
use crate::requests::RequestQueue;

/// Loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    None,
    /// Replay the current song on every completion
    Infinite,
    /// Replay `target` exactly `remaining` more times
    Bounded {
        remaining: u32,
        target: MediaReference,
        /// A plain `loop` was already refused once; the next one cancels
        cancel_armed: bool,
    },
}

impl LoopMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, LoopMode::None)
    }

    pub fn status(&self) -> LoopStatus {
        match self {
            LoopMode::None => LoopStatus::Off,
            LoopMode::Infinite => LoopStatus::Infinite,
            LoopMode::Bounded { remaining, .. } => LoopStatus::Bounded {
                remaining: *remaining,
            },
        }
    }
}

/// How `acquire_handle` treats an existing player handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAcquisition {
    /// Keep the current handle if it was built for the same song and source
    ReuseIfPresent,
    /// Always build a new handle (retries, loop replays, advances)
    ForceRefresh,
}

/// Result of `shuffle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleOutcome {
    Shuffled(usize),
    NothingToShuffle,
}

/// Snapshot of a guild's playback for display
#[derive(Debug, Clone, Serialize)]
pub struct QueueView {
    pub current: Option<MediaReference>,
    pub upcoming: Vec<MediaReference>,
    pub loop_status: LoopStatus,
    pub state: PlaybackState,
    /// Ids of upcoming items that play from a local download
    pub deferred_ids: Vec<String>,
    pub total_upcoming_secs: u64,
}

/// Per-guild mutable state
#[derive(Debug)]
pub struct GuildSession {
    pub guild_id: GuildId,

    /// Pending playback, FIFO
    pub queue: VecDeque<MediaReference>,

    pub current_song: Option<MediaReference>,
    pub previous_song: Option<MediaReference>,

    pub loop_mode: LoopMode,

    /// Consecutive engine errors on the current item
    pub retry_count: u32,

    /// Items that must play from a local download instead of streaming
    pub requires_download: HashSet<MediaReference>,

    /// Resolver task is running
    pub processing: bool,

    pub player_handle: Option<PlayerHandle>,

    pub requests: RequestQueue,

    pub state: PlaybackState,

    /// Voice channel of the last accepted play request
    pub(crate) voice_channel: Option<ChannelId>,

    /// Bumped on every play, stop and reset; completions carrying an older
    /// value are ignored
    pub(crate) generation: u64,

    /// A completion-driven advance hit an undownloaded item; the prefetch task
    /// resumes playback once it lands
    pub(crate) awaiting_download: bool,

    pub(crate) prefetch_task: Option<JoinHandle<()>>,

    /// Ids of deferred items a download worker is fetching right now
    pub(crate) downloads_in_flight: HashSet<String>,
}

impl GuildSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            queue: VecDeque::new(),
            current_song: None,
            previous_song: None,
            loop_mode: LoopMode::None,
            retry_count: 0,
            requires_download: HashSet::new(),
            processing: false,
            player_handle: None,
            requests: RequestQueue::new(),
            state: PlaybackState::Idle,
            voice_channel: None,
            generation: 0,
            awaiting_download: false,
            prefetch_task: None,
            downloads_in_flight: HashSet::new(),
        }
    }

    /// Sum of the durations still waiting in the queue
    pub fn queued_secs(&self) -> u64 {
        self.queue.iter().map(|m| m.duration_secs).sum()
    }

    pub fn is_deferred(&self, media: &MediaReference) -> bool {
        self.requires_download.contains(media)
    }

    /// Queued deferred items, in play order
    pub fn pending_downloads(&self) -> Vec<MediaReference> {
        self.queue
            .iter()
            .filter(|m| self.requires_download.contains(*m))
            .cloned()
            .collect()
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// State to report while the current song is audible
    pub(crate) fn audible_state(&self) -> PlaybackState {
        if self.loop_mode.is_active() {
            PlaybackState::Looping
        } else {
            PlaybackState::Playing
        }
    }

    /// Handle for the current song, built or reused per `mode`
    ///
    /// Returns None when there is no current song.
    pub fn acquire_handle(
        &mut self,
        mode: PlayerAcquisition,
        source: TrackSource,
    ) -> Option<PlayerHandle> {
        let song = self.current_song.clone()?;

        let reusable = mode == PlayerAcquisition::ReuseIfPresent
            && self
                .player_handle
                .as_ref()
                .map(|h| h.media == song && h.source == source)
                .unwrap_or(false);

        if !reusable {
            self.player_handle = Some(PlayerHandle::new(song, source));
        }
        self.player_handle.clone()
    }

    /// Randomly permute the queue in place
    pub fn shuffle(&mut self) -> ShuffleOutcome {
        if self.queue.is_empty() {
            return ShuffleOutcome::NothingToShuffle;
        }
        self.queue.make_contiguous().shuffle(&mut rand::thread_rng());
        ShuffleOutcome::Shuffled(self.queue.len())
    }

    /// Wipe the session after the voice connection dropped
    ///
    /// Returns the items that were queued so their local copies can be deleted.
    pub fn reset(&mut self) -> Vec<MediaReference> {
        if let Some(task) = self.prefetch_task.take() {
            task.abort();
        }

        let queued: Vec<MediaReference> = self.queue.drain(..).collect();
        self.current_song = None;
        self.player_handle = None;
        self.loop_mode = LoopMode::None;
        self.retry_count = 0;
        self.requires_download.clear();
        self.awaiting_download = false;
        self.downloads_in_flight.clear();
        self.voice_channel = None;
        self.state = PlaybackState::Idle;
        self.next_generation();
        queued
    }

    pub fn view(&self) -> QueueView {
        QueueView {
            current: self.current_song.clone(),
            upcoming: self.queue.iter().cloned().collect(),
            loop_status: self.loop_mode.status(),
            state: self.state,
            deferred_ids: self.pending_downloads().into_iter().map(|m| m.id).collect(),
            total_upcoming_secs: self.queued_secs(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_media(id: &str, duration_secs: u64) -> MediaReference {
    MediaReference::new(
        id,
        format!("Title {}", id),
        format!("https://stream/{}", id),
        format!("https://watch/{}", id),
        duration_secs,
    )
}
