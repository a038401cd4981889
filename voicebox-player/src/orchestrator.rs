//! Caller-facing orchestrator
//!
//! The command layer talks to this and nothing else. Each method maps to one
//! chat command; failures come back as `PlayerError` for the command layer to
//! word, while outcomes reached from completion context arrive on the event bus.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use voicebox_common::config::{prepare_storage_dir, TomlConfig};
use voicebox_common::events::{GuildEvent, LoopStatus};
use voicebox_common::{GuildId, MediaReference};

use crate::backends::{AudioEngine, Downloader, Resolver, SelectionPrompt};
use crate::config::PlayerSettings;
use crate::db::settings_store_from_config;
use crate::error::{Precondition, Result};
use crate::playback::download::{admit, ensure_prefetch, fetch_first_deferred};
use crate::playback::{AdvanceOutcome, PlayOutcome, PlaybackEngine, PlaybackState};
use crate::requests::{resolver_task, Job, Requester};
use crate::session::{QueueView, ShuffleOutcome};
use crate::state::{Backends, SharedState};

/// What a successful play request did
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueReport {
    /// Items appended to the queue
    pub added: usize,
    /// Title of the added item when exactly one was added
    pub single_title: Option<String>,
    /// Items refused for exceeding the stream lifetime
    pub rejected: Vec<MediaReference>,
    /// Added items that will play from a download
    pub deferred: Vec<MediaReference>,
    /// This request started playback (the guild was idle)
    pub started: bool,
    /// Playback will start once the head of the queue is downloaded
    pub waiting_on_download: bool,
}

/// Media playback orchestrator for all guilds
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<SharedState>,
    engine: PlaybackEngine,
}

impl Orchestrator {
    pub fn new(settings: PlayerSettings, backends: Backends) -> Self {
        let shared = Arc::new(SharedState::new(settings, backends));
        let engine = PlaybackEngine::new(Arc::clone(&shared));
        Self { shared, engine }
    }

    /// Build from the bootstrap configuration
    ///
    /// Prepares the storage folder (purging media left by a previous run) and
    /// opens the configured guild settings store.
    pub async fn from_config(
        config: &TomlConfig,
        resolver: Arc<dyn Resolver>,
        downloader: Arc<dyn Downloader>,
        audio: Arc<dyn AudioEngine>,
        prompt: Arc<dyn SelectionPrompt>,
    ) -> Result<Self> {
        prepare_storage_dir(&config.storage_dir)?;
        let settings = settings_store_from_config(config).await?;

        info!(storage_dir = %config.storage_dir.display(), "Media orchestrator ready");
        Ok(Self::new(
            PlayerSettings::from(config),
            Backends {
                resolver,
                downloader,
                audio,
                prompt,
                settings,
            },
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuildEvent> {
        self.shared.events.subscribe()
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.shared.settings
    }

    /// Resolve `text`, queue the result and start playback if idle
    ///
    /// Only one play request per guild is outstanding at a time; a second one
    /// waits here until the first has collected its resolution.
    pub async fn submit_play_request(
        &self,
        guild_id: GuildId,
        requester: Requester,
        text: &str,
    ) -> Result<EnqueueReport> {
        let Some(channel) = requester.voice_channel else {
            return Err(Precondition::NotInVoiceChannel.into());
        };
        if text.trim().is_empty() {
            return Err(Precondition::EmptyInput.into());
        }

        let entry = self.shared.guild(guild_id).await;
        let job = Job::classify(text, requester);
        let job_id = job.id;
        let job_ref = job.event_ref();
        info!(
            guild_id = %guild_id,
            job_id = %job_id,
            kind = ?job.kind,
            "Play request '{}'",
            job.payload
        );

        let resolution = {
            let _gate = entry.request_gate.lock().await;
            resolver_task::submit(&self.shared, &entry, job).await;

            let wait = self.shared.vault.wait_for(guild_id, job_id);
            tokio::pin!(wait);
            tokio::select! {
                resolution = &mut wait => resolution,
                _ = tokio::time::sleep(self.shared.settings.slow_resolution_notice) => {
                    debug!(guild_id = %guild_id, job_id = %job_id, "Resolution is slow");
                    self.shared.emit(GuildEvent::ResolutionSlow {
                        guild_id,
                        job: job_ref.clone(),
                        waited_secs: self.shared.settings.slow_resolution_notice.as_secs(),
                        timestamp: Utc::now(),
                    });
                    wait.await
                }
            }
        };

        let items = match resolution {
            Ok(items) => items,
            Err(failure) => {
                self.shared.emit(GuildEvent::ResolutionFailed {
                    guild_id,
                    job: job_ref,
                    reason: failure.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(failure.into());
            }
        };

        let admission = {
            let mut session = entry.session.lock().await;
            admit(&mut session, items, self.shared.settings.stream_lifetime_cap_secs)
        };
        for media in &admission.rejected {
            self.shared.emit(GuildEvent::ItemRejected {
                guild_id,
                media: media.clone(),
                timestamp: Utc::now(),
            });
        }

        let mut report = EnqueueReport {
            added: admission.accepted.len(),
            single_title: match admission.accepted.as_slice() {
                [only] => Some(only.title.clone()),
                _ => None,
            },
            rejected: admission.rejected.clone(),
            deferred: admission.deferred.clone(),
            started: false,
            waiting_on_download: false,
        };
        if admission.accepted.is_empty() {
            return Ok(report);
        }

        fetch_first_deferred(&self.shared, &entry, &admission.deferred).await;

        let mut session = entry.session.lock().await;
        ensure_prefetch(&self.shared, &entry, &mut session);
        self.engine.ensure_connected(&mut session, channel).await?;

        match self.engine.play_song(&entry, &mut session).await? {
            PlayOutcome::Started => report.started = true,
            PlayOutcome::WaitingOnDownload => report.waiting_on_download = true,
            PlayOutcome::AlreadyPlaying | PlayOutcome::QueueEmpty => {}
        }

        info!(
            guild_id = %guild_id,
            added = report.added,
            rejected = report.rejected.len(),
            deferred = report.deferred.len(),
            started = report.started,
            "Play request done"
        );
        Ok(report)
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<AdvanceOutcome> {
        self.engine.skip(guild_id, false).await
    }

    /// Skip past any loop to the next queued item
    pub async fn force_skip(&self, guild_id: GuildId) -> Result<AdvanceOutcome> {
        self.engine.skip(guild_id, true).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<PlaybackState> {
        self.engine.pause(guild_id).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<PlaybackState> {
        self.engine.resume(guild_id).await
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<()> {
        self.engine.stop(guild_id).await
    }

    pub async fn clear(&self, guild_id: GuildId) -> Result<usize> {
        self.engine.clear(guild_id).await
    }

    pub async fn shuffle(&self, guild_id: GuildId) -> Result<ShuffleOutcome> {
        self.engine.shuffle(guild_id).await
    }

    /// `loop` (toggle) or `loop <n>`
    pub async fn set_loop(&self, guild_id: GuildId, count: Option<u32>) -> Result<LoopStatus> {
        self.engine.set_loop(guild_id, count).await
    }

    /// Toggle auto-pick of the first search result; administrators only
    ///
    /// Returns the new setting.
    pub async fn set_auto_pick(&self, guild_id: GuildId, requester: &Requester) -> Result<bool> {
        if !requester.is_admin {
            return Err(Precondition::InsufficientPermission.into());
        }

        let store = &self.shared.backends.settings;
        let enabled = !store.auto_pick(guild_id).await?;
        store.set_auto_pick(guild_id, enabled).await?;
        info!(guild_id = %guild_id, enabled, "Auto-pick changed");
        Ok(enabled)
    }

    pub async fn queue_view(&self, guild_id: GuildId) -> QueueView {
        self.engine.queue_view(guild_id).await
    }

    /// The bot was disconnected from voice (kicked, channel deleted, ...)
    ///
    /// Returns the number of local files deleted.
    pub async fn on_voice_disconnect(&self, guild_id: GuildId) -> Result<usize> {
        match self.engine.reset(guild_id).await {
            Ok(deleted) => Ok(deleted),
            Err(e) => {
                warn!(guild_id = %guild_id, "Session reset failed: {}", e);
                Err(e)
            }
        }
    }
}
