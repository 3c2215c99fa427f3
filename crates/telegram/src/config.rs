use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use firstmate_common::{ChannelId, OperatorId};

/// Configuration for the Telegram bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramBotConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Chat id of the managed channel.
    pub channel_id: ChannelId,

    /// Operator allowlist (Telegram user ids). An empty list denies
    /// everyone; there is no open mode for an admin bot.
    pub operators: Vec<OperatorId>,

    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: u32,
}

impl std::fmt::Debug for TelegramBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBotConfig")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("operators", &self.operators)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramBotConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            channel_id: ChannelId(0),
            operators: Vec::new(),
            poll_timeout_secs: 30,
        }
    }
}
