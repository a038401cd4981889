//! # Voicebox Player Library (voicebox-player)
//!
//! Per-guild media playback orchestration for a chat bot's voice feature.
//!
//! **Purpose:** Turn play requests (links or search queries) into a playback
//! queue, drive playback through the bot's audio engine (advance, loop, skip,
//! retry) and download items whose streaming links would expire before their
//! turn comes.
//!
//! **Architecture:** One `GuildSession` per guild behind an async mutex. A
//! per-guild resolver task drains resolution jobs one at a time and hands the
//! results back through the `Vault`. Blocking collaborator work (resolution,
//! downloads, file checks) runs on the tokio blocking pool. Outcomes that have
//! no caller to return to are published on the `EventBus`.

pub mod backends;
pub mod config;
pub mod db;
pub mod error;
pub mod orchestrator;
pub mod playback;
pub mod requests;
pub mod session;
pub mod state;

pub use backends::{AudioEngine, Downloader, Resolver, SelectionPrompt};
pub use config::PlayerSettings;
pub use error::{PlayerError, Precondition, ResolutionFailure, Result};
pub use orchestrator::{EnqueueReport, Orchestrator};
pub use playback::{AdvanceOutcome, PlayOutcome, PlaybackState};
pub use requests::Requester;
pub use session::{LoopMode, QueueView, ShuffleOutcome};
pub use state::Backends;
