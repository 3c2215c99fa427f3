//! Durable per-channel automation settings.
//!
//! One `ChannelConfig` row per managed channel, stored in SQLite. Updates
//! replace the full mutable field set in a single upsert, so a reader never
//! observes a half-applied record. Concurrent updates to the same channel
//! are serialized per channel id.

pub mod config;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use {
    config::{ChannelConfig, ConfigUpdate, MAX_COMMENT_LEN},
    error::{Error, Result},
    memory::MemorySettingsStore,
    sqlite::SqliteSettingsStore,
    store::SettingsStore,
};
