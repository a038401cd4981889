//! Guild settings access

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use voicebox_common::GuildId;

use crate::error::Result;

/// Per-guild configuration collaborator
#[async_trait]
pub trait GuildSettingsStore: Send + Sync + 'static {
    /// Whether searches skip interactive selection and take the best result
    async fn auto_pick(&self, guild_id: GuildId) -> Result<bool>;

    async fn set_auto_pick(&self, guild_id: GuildId, enabled: bool) -> Result<()>;
}

/// Settings kept for the life of the process only
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    auto_pick: RwLock<HashMap<GuildId, bool>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuildSettingsStore for MemorySettingsStore {
    async fn auto_pick(&self, guild_id: GuildId) -> Result<bool> {
        Ok(self
            .auto_pick
            .read()
            .await
            .get(&guild_id)
            .copied()
            .unwrap_or(false))
    }

    async fn set_auto_pick(&self, guild_id: GuildId, enabled: bool) -> Result<()> {
        self.auto_pick.write().await.insert(guild_id, enabled);
        Ok(())
    }
}

/// Settings persisted in the `guild_settings` table
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    db: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    /// Open the database file, creating the schema if needed
    pub async fn open(path: &Path) -> Result<Self> {
        let db = super::init::open_pool(path).await?;
        Ok(Self { db })
    }

    /// Wrap an existing pool (schema must already exist, see `init_schema`)
    pub fn from_pool(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GuildSettingsStore for SqliteSettingsStore {
    async fn auto_pick(&self, guild_id: GuildId) -> Result<bool> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT auto_pick FROM guild_settings WHERE guild_id = ?")
                .bind(guild_id.get() as i64)
                .fetch_optional(&self.db)
                .await?;

        Ok(value.map(|v| v != 0).unwrap_or(false))
    }

    async fn set_auto_pick(&self, guild_id: GuildId, enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, auto_pick)
            VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET auto_pick = excluded.auto_pick
            "#,
        )
        .bind(guild_id.get() as i64)
        .bind(i64::from(enabled))
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
