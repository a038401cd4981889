//! Orchestrator wired to the fakes

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use voicebox_common::events::GuildEvent;
use voicebox_common::{ChannelId, GuildId, UserId};
use voicebox_player::db::{GuildSettingsStore, MemorySettingsStore};
use voicebox_player::{Backends, Orchestrator, PlayerSettings, Requester};

use super::fakes::{FakeAudioEngine, FakeDownloader, FakePrompt, FakeResolver, PromptReply};

pub const GUILD: GuildId = GuildId(1000);

pub fn requester() -> Requester {
    Requester {
        user_id: UserId(1),
        text_channel: ChannelId(2),
        voice_channel: Some(ChannelId(3)),
        is_admin: false,
    }
}

pub fn admin() -> Requester {
    Requester {
        is_admin: true,
        ..requester()
    }
}

/// Settings with timings short enough for tests
pub fn fast_settings(storage: &TempDir) -> PlayerSettings {
    PlayerSettings {
        storage_dir: storage.path().to_path_buf(),
        prefetch_interval: Duration::from_millis(20),
        selection_timeout: Duration::from_millis(200),
        slow_resolution_notice: Duration::from_secs(5),
        ..PlayerSettings::default()
    }
}

pub struct TestContext {
    pub orchestrator: Orchestrator,
    pub resolver: Arc<FakeResolver>,
    pub downloader: Arc<FakeDownloader>,
    pub audio: Arc<FakeAudioEngine>,
    pub prompt: Arc<FakePrompt>,
    pub settings: Arc<MemorySettingsStore>,
    pub events: broadcast::Receiver<GuildEvent>,
    _storage: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    /// Build with `adjust` applied to the fast settings
    pub fn with_settings(adjust: impl FnOnce(&mut PlayerSettings)) -> Self {
        let storage = TempDir::new().unwrap();
        let mut player_settings = fast_settings(&storage);
        adjust(&mut player_settings);

        let resolver = Arc::new(FakeResolver::default());
        let downloader = Arc::new(FakeDownloader::new(storage.path().to_path_buf()));
        let audio = Arc::new(FakeAudioEngine::default());
        let prompt = Arc::new(FakePrompt::new(PromptReply::Says("1".to_string())));
        let settings = Arc::new(MemorySettingsStore::new());

        let orchestrator = Orchestrator::new(
            player_settings,
            Backends {
                resolver: resolver.clone(),
                downloader: downloader.clone(),
                audio: audio.clone(),
                prompt: prompt.clone(),
                settings: settings.clone() as Arc<dyn GuildSettingsStore>,
            },
        );
        let events = orchestrator.subscribe();

        Self {
            orchestrator,
            resolver,
            downloader,
            audio,
            prompt,
            settings,
            events,
            _storage: storage,
        }
    }

    /// Register a link for `items` and submit it
    pub async fn play_link(
        &self,
        id: &str,
        items: Vec<voicebox_common::MediaReference>,
    ) -> voicebox_player::Result<voicebox_player::EnqueueReport> {
        let url = super::fakes::link(id);
        self.resolver.add_link(url.clone(), items);
        self.orchestrator
            .submit_play_request(GUILD, requester(), &url)
            .await
    }

    /// Finish the current track and wait for the engine to react
    pub async fn finish_and_wait_for_plays(&self, expected_plays: usize) {
        assert!(self.audio.finish_current(GUILD), "nothing was playing");
        let audio = self.audio.clone();
        assert!(
            wait_until(move || audio.play_count() >= expected_plays).await,
            "expected {} plays",
            expected_plays
        );
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Wait up to two seconds for an event matching `pred`, skipping others
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<GuildEvent>,
    pred: impl Fn(&GuildEvent) -> bool,
) -> Option<GuildEvent> {
    let search = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), search)
        .await
        .ok()
        .flatten()
}

/// Everything currently buffered on `events`
pub fn drain_events(events: &mut broadcast::Receiver<GuildEvent>) -> Vec<GuildEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
