use serde::{Deserialize, Serialize};

use firstmate_common::{ChannelId, OperatorId};

use crate::error::{Error, Result};

/// Upper bound for the first-comment text, matching the Telegram message
/// size limit.
pub const MAX_COMMENT_LEN: usize = 4096;

/// Persisted automation settings for one managed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: ChannelId,
    /// Master switch for the first-comment automation.
    pub enabled: bool,
    /// Comment text attached under new posts. Empty means the automation is
    /// off regardless of `enabled`.
    pub comment_text: String,
    /// Unix millis of the last update, `0` for a never-configured channel.
    pub updated_at: i64,
    pub updated_by: Option<OperatorId>,
}

impl ChannelConfig {
    /// Default record returned for a channel that was never configured.
    #[must_use]
    pub fn disabled(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            enabled: false,
            comment_text: String::new(),
            updated_at: 0,
            updated_by: None,
        }
    }

    /// Whether a new post should receive a first comment.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.comment_text.trim().is_empty()
    }
}

/// The full mutable field set of a [`ChannelConfig`].
///
/// Updates always carry every mutable field so the store can replace the
/// record wholesale instead of merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub enabled: bool,
    pub comment_text: String,
}

/// Validate a candidate comment text against platform limits.
///
/// Empty text is valid (it disables the automation); oversized text is not.
pub fn validate_comment_text(text: &str) -> Result<()> {
    let len = text.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(Error::validation(format!(
            "comment text is {len} characters, limit is {MAX_COMMENT_LEN}"
        )));
    }
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_default_is_inactive() {
        let cfg = ChannelConfig::disabled(ChannelId(42));
        assert!(!cfg.enabled);
        assert!(cfg.comment_text.is_empty());
        assert!(!cfg.is_active());
        assert_eq!(cfg.updated_at, 0);
    }

    #[test]
    fn enabled_with_blank_text_is_inactive() {
        let cfg = ChannelConfig {
            enabled: true,
            comment_text: "   ".into(),
            ..ChannelConfig::disabled(ChannelId(42))
        };
        assert!(!cfg.is_active());
    }

    #[test]
    fn enabled_with_text_is_active() {
        let cfg = ChannelConfig {
            enabled: true,
            comment_text: "Discuss below!".into(),
            ..ChannelConfig::disabled(ChannelId(42))
        };
        assert!(cfg.is_active());
    }

    #[test]
    fn comment_text_at_limit_is_valid() {
        assert!(validate_comment_text(&"x".repeat(MAX_COMMENT_LEN)).is_ok());
    }

    #[test]
    fn comment_text_over_limit_is_rejected() {
        let err = validate_comment_text(&"x".repeat(MAX_COMMENT_LEN + 1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 4096 multibyte characters are within the limit even though the
        // byte length is far larger.
        assert!(validate_comment_text(&"é".repeat(MAX_COMMENT_LEN)).is_ok());
    }
}
