//! Event types for the voicebox event system
//!
//! Playback transitions happen in completion-callback context where there is no
//! caller to return a result to. Those outcomes are published as `GuildEvent`s on
//! the `EventBus`; the chat layer subscribes and turns them into messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::ids::GuildId;
use crate::media::MediaReference;

/// Job identifier as carried in events
///
/// Kept as a plain string so this crate does not need to know how the player
/// numbers its jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRef(pub String);

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loop state as reported to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoopStatus {
    Off,
    Infinite,
    Bounded { remaining: u32 },
}

/// Guild-scoped playback and request events
///
/// Events are broadcast via EventBus and serialize with a `type` tag so the
/// chat layer can forward them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GuildEvent {
    /// Resolution of a play request is taking longer than expected
    ResolutionSlow {
        guild_id: GuildId,
        job: JobRef,
        waited_secs: u64,
        timestamp: DateTime<Utc>,
    },

    /// A play request was aborted (no match, illegal selection, timeout)
    ResolutionFailed {
        guild_id: GuildId,
        job: JobRef,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An item was refused because it can never be streamed or fetched in time
    ItemRejected {
        guild_id: GuildId,
        media: MediaReference,
        timestamp: DateTime<Utc>,
    },

    /// A track started (or restarted for a loop or retry)
    NowPlaying {
        guild_id: GuildId,
        media: MediaReference,
        /// True when this is a loop replay of the same item
        replay: bool,
        timestamp: DateTime<Utc>,
    },

    /// The queue ran dry and the voice connection was released
    QueueFinished {
        guild_id: GuildId,
        timestamp: DateTime<Utc>,
    },

    /// Advancing hit an item whose download has not finished yet
    NextNotReady {
        guild_id: GuildId,
        media: MediaReference,
        timestamp: DateTime<Utc>,
    },

    /// The audio engine reported an error and the item was re-queued
    PlaybackRetry {
        guild_id: GuildId,
        media: MediaReference,
        attempt: u32,
        max_attempts: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Retries are exhausted; playback will not advance on its own
    PlaybackStalled {
        guild_id: GuildId,
        media: Option<MediaReference>,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Loop mode changed
    LoopChanged {
        guild_id: GuildId,
        status: LoopStatus,
        timestamp: DateTime<Utc>,
    },

    /// A deferred item finished downloading
    DownloadCompleted {
        guild_id: GuildId,
        media_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Voice connection dropped; the session was wiped
    SessionReset {
        guild_id: GuildId,
        files_deleted: usize,
        timestamp: DateTime<Utc>,
    },
}

impl GuildEvent {
    /// Guild this event belongs to
    pub fn guild_id(&self) -> GuildId {
        match self {
            GuildEvent::ResolutionSlow { guild_id, .. }
            | GuildEvent::ResolutionFailed { guild_id, .. }
            | GuildEvent::ItemRejected { guild_id, .. }
            | GuildEvent::NowPlaying { guild_id, .. }
            | GuildEvent::QueueFinished { guild_id, .. }
            | GuildEvent::NextNotReady { guild_id, .. }
            | GuildEvent::PlaybackRetry { guild_id, .. }
            | GuildEvent::PlaybackStalled { guild_id, .. }
            | GuildEvent::LoopChanged { guild_id, .. }
            | GuildEvent::DownloadCompleted { guild_id, .. }
            | GuildEvent::SessionReset { guild_id, .. } => *guild_id,
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block playback transitions)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use voicebox_common::events::{EventBus, GuildEvent};
/// use voicebox_common::GuildId;
///
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(GuildEvent::QueueFinished {
///     guild_id: GuildId(1),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.guild_id(), GuildId(1));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GuildEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GuildEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GuildEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_before_subscribe_are_dropped() {
        let bus = EventBus::new(4);
        bus.emit_lossy(GuildEvent::QueueFinished {
            guild_id: GuildId(3),
            timestamp: Utc::now(),
        });

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = GuildEvent::LoopChanged {
            guild_id: GuildId(9),
            status: LoopStatus::Bounded { remaining: 2 },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LoopChanged");
        assert_eq!(json["guild_id"], 9);
        assert_eq!(json["status"]["mode"], "bounded");
        assert_eq!(json["status"]["remaining"], 2);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        for id in 1..=3u64 {
            bus.emit_lossy(GuildEvent::QueueFinished {
                guild_id: GuildId(id),
                timestamp: Utc::now(),
            });
        }

        for id in 1..=3u64 {
            assert_eq!(rx.recv().await.unwrap().guild_id(), GuildId(id));
        }
    }
}
