//! In-memory collaborators
//!
//! Each fake records what the orchestrator asked of it so tests can assert on
//! the calls, and exposes knobs to script failures.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use voicebox_common::{ChannelId, GuildId, MediaReference};
use voicebox_player::backends::{
    AudioEngine, AudioError, DownloadError, Downloader, PlayerHandle, ResolveError, Resolver,
    SelectionPrompt, TrackCompletion, TrackOutcome,
};
use voicebox_player::Requester;

pub fn media(id: &str, duration_secs: u64) -> MediaReference {
    MediaReference::new(
        id,
        format!("Song {}", id),
        format!("https://stream.test/{}", id),
        format!("https://video.test/{}", id),
        duration_secs,
    )
}

pub fn link(id: &str) -> String {
    format!("https://video.test/{}", id)
}

/// Resolver answering from fixed tables
#[derive(Default)]
pub struct FakeResolver {
    links: Mutex<HashMap<String, Vec<MediaReference>>>,
    searches: Mutex<HashMap<String, Vec<MediaReference>>>,
    delay: Mutex<Option<Duration>>,
    /// (query, limit) of every search call
    pub search_calls: Mutex<Vec<(String, usize)>>,
}

impl FakeResolver {
    pub fn add_link(&self, url: impl Into<String>, items: Vec<MediaReference>) {
        self.links.lock().unwrap().insert(url.into(), items);
    }

    pub fn add_search(&self, query: impl Into<String>, items: Vec<MediaReference>) {
        self.searches.lock().unwrap().insert(query.into(), items);
    }

    /// Make every resolution block the worker for `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl Resolver for FakeResolver {
    fn resolve_by_url(&self, url: &str) -> Result<Vec<MediaReference>, ResolveError> {
        self.pause();
        self.links
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(ResolveError::NoMatch)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaReference>, ResolveError> {
        self.pause();
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        let mut results = self
            .searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or(ResolveError::NoMatch)?;
        results.truncate(limit);
        Ok(results)
    }
}

/// Downloader with an in-memory "disk"
pub struct FakeDownloader {
    root: PathBuf,
    present: Mutex<HashSet<String>>,
    blocked: Mutex<HashSet<String>>,
    active: Mutex<HashSet<String>>,
    fetch_delay: Mutex<Option<Duration>>,
    pub fetched: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    /// Ids fetched by two workers at the same time
    pub overlapping: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            present: Mutex::new(HashSet::new()),
            blocked: Mutex::new(HashSet::new()),
            active: Mutex::new(HashSet::new()),
            fetch_delay: Mutex::new(None),
            fetched: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            overlapping: Mutex::new(Vec::new()),
        }
    }

    /// Make every fetch of a missing item take `delay`
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    /// Fail every fetch of `id` until `unblock`
    pub fn block(&self, id: &str) {
        self.blocked.lock().unwrap().insert(id.to_string());
    }

    pub fn unblock(&self, id: &str) {
        self.blocked.lock().unwrap().remove(id);
    }

    pub fn is_present(&self, id: &str) -> bool {
        self.present.lock().unwrap().contains(id)
    }

    pub fn fetched_ids(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl Downloader for FakeDownloader {
    fn fetch_first(&self, items: &[MediaReference]) -> Result<(), DownloadError> {
        let first = items.first().ok_or(DownloadError::NoItems)?;
        self.fetch_one(first)
    }

    fn fetch_one(&self, item: &MediaReference) -> Result<(), DownloadError> {
        if self.blocked.lock().unwrap().contains(&item.id) {
            return Err(DownloadError::Failed(format!("{} is unavailable", item.id)));
        }
        if self.is_present(&item.id) {
            return Ok(());
        }
        if !self.active.lock().unwrap().insert(item.id.clone()) {
            self.overlapping.lock().unwrap().push(item.id.clone());
        }
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.present.lock().unwrap().insert(item.id.clone()) {
            self.fetched.lock().unwrap().push(item.id.clone());
        }
        self.active.lock().unwrap().remove(&item.id);
        Ok(())
    }

    fn exists(&self, item: &MediaReference) -> bool {
        self.is_present(&item.id)
    }

    fn local_path(&self, item: &MediaReference) -> PathBuf {
        self.root.join(format!("{}.mp3", item.id))
    }

    fn delete(&self, item: &MediaReference) -> Result<bool, DownloadError> {
        let removed = self.present.lock().unwrap().remove(&item.id);
        if removed {
            self.deleted.lock().unwrap().push(item.id.clone());
        }
        Ok(removed)
    }
}

#[derive(Default)]
struct AudioGuild {
    connected: bool,
    playing: bool,
    completion: Option<oneshot::Sender<TrackOutcome>>,
}

/// Audio engine whose tracks only end when the test says so
#[derive(Default)]
pub struct FakeAudioEngine {
    guilds: Mutex<HashMap<GuildId, AudioGuild>>,
    plays: Mutex<Vec<(GuildId, PlayerHandle)>>,
    failing_starts: Mutex<u32>,
    pub connects: Mutex<Vec<(GuildId, ChannelId)>>,
}

impl FakeAudioEngine {
    /// End the current track normally. False if nothing was playing.
    pub fn finish_current(&self, guild_id: GuildId) -> bool {
        self.complete(guild_id, TrackOutcome::Finished)
    }

    /// End the current track with an engine error
    pub fn fail_current(&self, guild_id: GuildId, error: &str) -> bool {
        self.complete(guild_id, TrackOutcome::Failed(error.to_string()))
    }

    fn complete(&self, guild_id: GuildId, outcome: TrackOutcome) -> bool {
        let sender = {
            let mut guilds = self.guilds.lock().unwrap();
            let guild = guilds.entry(guild_id).or_default();
            guild.playing = false;
            guild.completion.take()
        };
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Make the next `count` `play` calls fail
    pub fn fail_next_starts(&self, count: u32) {
        *self.failing_starts.lock().unwrap() = count;
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    pub fn played_ids(&self, guild_id: GuildId) -> Vec<String> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| *g == guild_id)
            .map(|(_, h)| h.media.id.clone())
            .collect()
    }

    pub fn last_handle(&self) -> Option<PlayerHandle> {
        self.plays.lock().unwrap().last().map(|(_, h)| h.clone())
    }
}

#[async_trait]
impl AudioEngine for FakeAudioEngine {
    async fn connect(&self, guild_id: GuildId, channel: ChannelId) -> Result<(), AudioError> {
        self.connects.lock().unwrap().push((guild_id, channel));
        self.guilds.lock().unwrap().entry(guild_id).or_default().connected = true;
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), AudioError> {
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.entry(guild_id).or_default();
        guild.connected = false;
        guild.playing = false;
        guild.completion = None;
        Ok(())
    }

    async fn play(
        &self,
        guild_id: GuildId,
        handle: &PlayerHandle,
    ) -> Result<TrackCompletion, AudioError> {
        {
            let mut failing = self.failing_starts.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(AudioError("decoder refused the source".to_string()));
            }
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut guilds = self.guilds.lock().unwrap();
            let guild = guilds.entry(guild_id).or_default();
            guild.playing = true;
            // Replacing the sender drops the previous track's completion
            guild.completion = Some(tx);
        }
        self.plays.lock().unwrap().push((guild_id, handle.clone()));
        Ok(rx)
    }

    fn pause(&self, guild_id: GuildId) {
        if let Some(guild) = self.guilds.lock().unwrap().get_mut(&guild_id) {
            guild.playing = false;
        }
    }

    fn resume(&self, guild_id: GuildId) {
        if let Some(guild) = self.guilds.lock().unwrap().get_mut(&guild_id) {
            guild.playing = guild.completion.is_some();
        }
    }

    fn is_playing(&self, guild_id: GuildId) -> bool {
        self.guilds
            .lock()
            .unwrap()
            .get(&guild_id)
            .map(|g| g.playing)
            .unwrap_or(false)
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.guilds
            .lock()
            .unwrap()
            .get(&guild_id)
            .map(|g| g.connected)
            .unwrap_or(false)
    }
}

/// What the requester does when shown candidates
#[derive(Debug, Clone)]
pub enum PromptReply {
    Says(String),
    /// Never answers
    Silent,
    /// Channel gone
    Closed,
}

pub struct FakePrompt {
    reply: Mutex<PromptReply>,
    pub offered: Mutex<Vec<usize>>,
}

impl FakePrompt {
    pub fn new(reply: PromptReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            offered: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: PromptReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn times_asked(&self) -> usize {
        self.offered.lock().unwrap().len()
    }
}

#[async_trait]
impl SelectionPrompt for FakePrompt {
    async fn choose(
        &self,
        _requester: &Requester,
        candidates: &[MediaReference],
    ) -> Option<String> {
        self.offered.lock().unwrap().push(candidates.len());
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            PromptReply::Says(text) => Some(text),
            PromptReply::Silent => std::future::pending().await,
            PromptReply::Closed => None,
        }
    }
}
