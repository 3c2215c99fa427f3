use async_trait::async_trait;

use firstmate_common::{ChannelId, OperatorId};

use crate::{
    config::{ChannelConfig, ConfigUpdate},
    error::Result,
};

/// Persistent storage for per-channel automation settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the settings for a channel.
    ///
    /// A channel that was never configured yields a default-disabled record,
    /// never a not-found error.
    async fn get(&self, channel_id: ChannelId) -> Result<ChannelConfig>;

    /// Validate and atomically replace the mutable fields of a channel's
    /// settings, stamping last-modified metadata.
    ///
    /// Concurrent updates to the same channel are serialized; a reader never
    /// observes a record mixing fields from two different updates.
    async fn update(
        &self,
        channel_id: ChannelId,
        update: ConfigUpdate,
        updated_by: OperatorId,
    ) -> Result<ChannelConfig>;
}
