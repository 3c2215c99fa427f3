//! Telegram transport adapter for firstmate.
//!
//! Uses the teloxide library to long-poll the Bot API: operator DMs and
//! inline-keyboard presses drive the settings menu, channel-post updates
//! feed the automation pipeline, and the outbound side attaches first
//! comments and delivers failure notifications.

pub mod access;
pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;

pub use {
    config::TelegramBotConfig,
    outbound::{TelegramNotifier, TelegramPoster},
};
