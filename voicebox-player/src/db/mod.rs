//! Per-guild settings persistence
//!
//! The only persisted setting is whether searches auto-pick the best result
//! or ask the requester to choose. Unseen guilds choose manually.

mod init;
mod settings;

pub use init::{init_schema, open_pool};
pub use settings::{GuildSettingsStore, MemorySettingsStore, SqliteSettingsStore};

use std::sync::Arc;
use tracing::info;
use voicebox_common::config::TomlConfig;

use crate::error::Result;

/// Build the settings store the configuration asks for
///
/// SQLite when `database_path` is set, in-memory otherwise.
pub async fn settings_store_from_config(
    config: &TomlConfig,
) -> Result<Arc<dyn GuildSettingsStore>> {
    match &config.database_path {
        Some(path) => {
            let store = SqliteSettingsStore::open(path).await?;
            Ok(Arc::new(store))
        }
        None => {
            info!("No database_path configured, guild settings will not persist");
            Ok(Arc::new(MemorySettingsStore::new()))
        }
    }
}
