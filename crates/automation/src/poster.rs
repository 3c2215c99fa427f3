use std::time::Duration;

use {async_trait::async_trait, thiserror::Error};

use firstmate_common::{ChannelId, PostId};

/// Typed failure of the attach-comment action.
///
/// The split drives the retry policy: transient variants are retried with
/// backoff, permanent ones are reported immediately.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("post or channel not found")]
    NotFound,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("content rejected: {0}")]
    InvalidContent(String),

    /// Any other rejection the platform reports. Treated as permanent:
    /// retrying an unclassified API error just repeats it.
    #[error("rejected by platform: {0}")]
    Rejected(String),
}

impl PostError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout | Self::Network(_)
        )
    }
}

/// The transport action that attaches a comment under a channel post.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    async fn attach_comment(
        &self,
        channel_id: ChannelId,
        post_id: PostId,
        text: &str,
    ) -> Result<(), PostError>;
}

/// Operator-visible reporting channel for terminal dispatch failures.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify_failure(&self, channel_id: ChannelId, post_id: PostId, reason: &str);
}
