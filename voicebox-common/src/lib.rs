//! # Voicebox Common Library
//!
//! Shared code for the voicebox playback orchestrator and the bot that embeds it:
//! - Identifier newtypes (guild, channel, user)
//! - Media descriptors produced by the external resolver
//! - Event types (GuildEvent enum) and the EventBus
//! - Configuration loading
//! - Logging initialization
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod ids;
pub mod logging;
pub mod media;

pub use error::{Error, Result};
pub use ids::{ChannelId, GuildId, UserId};
pub use media::{MediaReference, TrackSource};
