//! In-memory store for tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use {async_trait::async_trait, tokio::sync::Mutex};

use firstmate_common::{ChannelId, OperatorId, time::now_ms};

use crate::{
    config::{self, ChannelConfig, ConfigUpdate},
    error::{Error, Result},
    store::SettingsStore,
};

/// In-memory store backed by `HashMap`. No persistence, for tests only.
///
/// `set_storage_failing(true)` makes every operation fail with a storage
/// error, for exercising the "persistence unavailable" paths.
pub struct MemorySettingsStore {
    rows: Mutex<HashMap<i64, ChannelConfig>>,
    fail_storage: AtomicBool,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_storage: AtomicBool::new(false),
        }
    }

    pub fn set_storage_failing(&self, failing: bool) {
        self.fail_storage.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(Error::Storage(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, channel_id: ChannelId) -> Result<ChannelConfig> {
        self.check_available()?;
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&channel_id.get())
            .cloned()
            .unwrap_or_else(|| ChannelConfig::disabled(channel_id)))
    }

    async fn update(
        &self,
        channel_id: ChannelId,
        update: ConfigUpdate,
        updated_by: OperatorId,
    ) -> Result<ChannelConfig> {
        config::validate_comment_text(&update.comment_text)?;
        self.check_available()?;

        let mut rows = self.rows.lock().await;
        let prev_stamp = rows.get(&channel_id.get()).map_or(0, |c| c.updated_at);
        let config = ChannelConfig {
            channel_id,
            enabled: update.enabled,
            comment_text: update.comment_text,
            updated_at: now_ms().max(prev_stamp + 1),
            updated_by: Some(updated_by),
        };
        rows.insert(channel_id.get(), config.clone());
        Ok(config)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_unconfigured_returns_disabled_default() {
        let store = MemorySettingsStore::new();
        let cfg = store.get(ChannelId(42)).await.unwrap();
        assert_eq!(cfg, ChannelConfig::disabled(ChannelId(42)));
    }

    #[tokio::test]
    async fn update_roundtrip() {
        let store = MemorySettingsStore::new();
        store
            .update(
                ChannelId(42),
                ConfigUpdate {
                    enabled: true,
                    comment_text: "hello".into(),
                },
                OperatorId(1),
            )
            .await
            .unwrap();
        let cfg = store.get(ChannelId(42)).await.unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.comment_text, "hello");
    }

    #[tokio::test]
    async fn validation_applies_before_storage() {
        let store = MemorySettingsStore::new();
        let err = store
            .update(
                ChannelId(42),
                ConfigUpdate {
                    enabled: true,
                    comment_text: "x".repeat(crate::MAX_COMMENT_LEN + 1),
                },
                OperatorId(1),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn injected_failure_surfaces_storage_error() {
        let store = MemorySettingsStore::new();
        store.set_storage_failing(true);
        let err = store.get(ChannelId(42)).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        store.set_storage_failing(false);
        assert!(store.get(ChannelId(42)).await.is_ok());
    }
}
