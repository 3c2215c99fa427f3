use std::{collections::HashMap, sync::Arc};

use {async_trait::async_trait, sqlx::SqlitePool, tokio::sync::Mutex, tracing::debug};

use firstmate_common::{ChannelId, OperatorId, time::now_ms};

use crate::{
    config::{self, ChannelConfig, ConfigUpdate},
    error::Result,
    store::SettingsStore,
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct SettingsRow {
    channel_id: i64,
    enabled: bool,
    comment_text: String,
    updated_at: i64,
    updated_by: Option<i64>,
}

impl From<SettingsRow> for ChannelConfig {
    fn from(r: SettingsRow) -> Self {
        Self {
            channel_id: ChannelId(r.channel_id),
            enabled: r.enabled,
            comment_text: r.comment_text,
            updated_at: r.updated_at,
            updated_by: r.updated_by.map(OperatorId),
        }
    }
}

/// SQLite-backed settings store.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    /// One lock per channel id; serializes the stamp-then-upsert sequence so
    /// concurrent updates to the same channel cannot interleave.
    update_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            update_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize the settings table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_settings (
                channel_id   INTEGER PRIMARY KEY,
                enabled      INTEGER NOT NULL DEFAULT 0,
                comment_text TEXT    NOT NULL DEFAULT '',
                updated_at   INTEGER NOT NULL,
                updated_by   INTEGER
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn lock_for(&self, channel_id: ChannelId) -> Arc<Mutex<()>> {
        let mut locks = self.update_locks.lock().await;
        Arc::clone(locks.entry(channel_id.get()).or_default())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, channel_id: ChannelId) -> Result<ChannelConfig> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT * FROM channel_settings WHERE channel_id = ?",
        )
        .bind(channel_id.get())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(Into::into)
            .unwrap_or_else(|| ChannelConfig::disabled(channel_id)))
    }

    async fn update(
        &self,
        channel_id: ChannelId,
        update: ConfigUpdate,
        updated_by: OperatorId,
    ) -> Result<ChannelConfig> {
        config::validate_comment_text(&update.comment_text)?;

        let lock = self.lock_for(channel_id).await;
        let _guard = lock.lock().await;

        let prev: Option<i64> =
            sqlx::query_scalar("SELECT updated_at FROM channel_settings WHERE channel_id = ?")
                .bind(channel_id.get())
                .fetch_optional(&self.pool)
                .await?;
        // Strictly newer than the previous stamp even within one millisecond.
        let stamp = now_ms().max(prev.unwrap_or(0) + 1);

        sqlx::query(
            r#"INSERT INTO channel_settings (channel_id, enabled, comment_text, updated_at, updated_by)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(channel_id) DO UPDATE SET
                 enabled = excluded.enabled,
                 comment_text = excluded.comment_text,
                 updated_at = excluded.updated_at,
                 updated_by = excluded.updated_by"#,
        )
        .bind(channel_id.get())
        .bind(update.enabled)
        .bind(&update.comment_text)
        .bind(stamp)
        .bind(updated_by.get())
        .execute(&self.pool)
        .await?;

        debug!(
            channel_id = channel_id.get(),
            enabled = update.enabled,
            text_len = update.comment_text.chars().count(),
            operator = updated_by.get(),
            "channel settings updated"
        );

        Ok(ChannelConfig {
            channel_id,
            enabled: update.enabled,
            comment_text: update.comment_text,
            updated_at: stamp,
            updated_by: Some(updated_by),
        })
    }
}
