//! Shared identifier types and time helpers used across all firstmate crates.

pub mod ids;
pub mod time;

pub use ids::{ChannelId, OperatorId, PostId};
