//! Shared orchestrator state
//!
//! One `SharedState` per process: the collaborators, the vault, the event bus
//! and the registry of guild sessions. Guilds never share a lock; the registry
//! lock is only held long enough to look up or insert an entry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use voicebox_common::events::{EventBus, GuildEvent};
use voicebox_common::GuildId;

use crate::backends::{AudioEngine, Downloader, Resolver, SelectionPrompt};
use crate::config::PlayerSettings;
use crate::db::GuildSettingsStore;
use crate::error::{PlayerError, Result};
use crate::requests::Vault;
use crate::session::GuildSession;

/// Collaborators supplied by the embedding bot
#[derive(Clone)]
pub struct Backends {
    pub resolver: Arc<dyn Resolver>,
    pub downloader: Arc<dyn Downloader>,
    pub audio: Arc<dyn AudioEngine>,
    pub prompt: Arc<dyn SelectionPrompt>,
    pub settings: Arc<dyn GuildSettingsStore>,
}

/// Registry entry for one guild
pub struct GuildEntry {
    pub guild_id: GuildId,

    /// All mutable guild state
    pub session: Mutex<GuildSession>,

    /// Held by a play request from submission until its resolution is taken
    /// from the vault, so at most one request per guild is outstanding
    pub(crate) request_gate: Mutex<()>,
}

impl GuildEntry {
    fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            session: Mutex::new(GuildSession::new(guild_id)),
            request_gate: Mutex::new(()),
        }
    }
}

/// Shared state accessible by all components
pub struct SharedState {
    pub settings: PlayerSettings,
    pub backends: Backends,
    pub vault: Vault,
    pub events: EventBus,
    guilds: RwLock<HashMap<GuildId, Arc<GuildEntry>>>,
}

impl SharedState {
    pub fn new(settings: PlayerSettings, backends: Backends) -> Self {
        let events = EventBus::new(settings.event_capacity);
        Self {
            settings,
            backends,
            vault: Vault::new(),
            events,
            guilds: RwLock::new(HashMap::new()),
        }
    }

    /// Guild entry, created on first interaction
    pub async fn guild(&self, guild_id: GuildId) -> Arc<GuildEntry> {
        if let Some(entry) = self.guilds.read().await.get(&guild_id) {
            return Arc::clone(entry);
        }

        let mut guilds = self.guilds.write().await;
        Arc::clone(guilds.entry(guild_id).or_insert_with(|| {
            debug!(guild_id = %guild_id, "Creating guild session");
            Arc::new(GuildEntry::new(guild_id))
        }))
    }

    /// Guild entry if the guild was ever seen
    pub async fn existing_guild(&self, guild_id: GuildId) -> Option<Arc<GuildEntry>> {
        self.guilds.read().await.get(&guild_id).cloned()
    }

    pub fn emit(&self, event: GuildEvent) {
        self.events.emit_lossy(event);
    }

    /// Run blocking collaborator work on the worker pool
    pub async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| PlayerError::Internal(format!("Worker task failed: {}", e)))
    }
}
