use std::{collections::HashSet, sync::Arc, time::Duration};

use {
    tokio::sync::Mutex,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use firstmate_common::{ChannelId, PostId};

use crate::{
    poster::{CommentPoster, FailureNotifier, PostError},
    recent::RecentPosts,
};

/// Backoff schedule for transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after `attempt` failed tries (1-based): doubles from
    /// `base_delay`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }
}

/// Terminal result of one dispatch sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { attempts: u32 },
    /// A comment for this post was already attached or is being attached.
    AlreadyPosted,
    FailedTerminal { attempts: u32, reason: String },
    /// Shutdown interrupted the retry sequence; not resumed.
    Abandoned { attempts: u32 },
}

/// In-flight state of one dispatch, for logging and inspection.
#[derive(Debug, Clone)]
pub struct AutomationAttempt {
    pub channel_id: ChannelId,
    pub post_id: PostId,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Post ids the dispatcher has handled: successes (bounded, aged out) plus
/// the set currently in flight.
struct DispatchLedger {
    posted: RecentPosts,
    inflight: HashSet<i64>,
}

/// Attaches first comments with retry, duplicate defense, and terminal
/// failure reporting.
pub struct CommentDispatcher {
    poster: Arc<dyn CommentPoster>,
    notifier: Arc<dyn FailureNotifier>,
    policy: RetryPolicy,
    ledger: Mutex<DispatchLedger>,
    shutdown: CancellationToken,
}

impl CommentDispatcher {
    pub fn new(
        poster: Arc<dyn CommentPoster>,
        notifier: Arc<dyn FailureNotifier>,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            poster,
            notifier,
            policy,
            ledger: Mutex::new(DispatchLedger {
                posted: RecentPosts::with_defaults(),
                inflight: HashSet::new(),
            }),
            shutdown,
        }
    }

    /// Attach `text` as the first comment under a channel post.
    ///
    /// At most one successful attach per post id: repeats and concurrent
    /// calls for a post already posted or in flight return
    /// [`Outcome::AlreadyPosted`] without touching the transport.
    pub async fn dispatch(&self, channel_id: ChannelId, post_id: PostId, text: &str) -> Outcome {
        if self.shutdown.is_cancelled() {
            warn!(
                channel_id = channel_id.get(),
                post_id = post_id.get(),
                "shutting down, not dispatching"
            );
            return Outcome::Abandoned { attempts: 0 };
        }

        {
            let mut ledger = self.ledger.lock().await;
            if ledger.posted.contains(post_id) || !ledger.inflight.insert(post_id.get()) {
                debug!(
                    channel_id = channel_id.get(),
                    post_id = post_id.get(),
                    "comment already attached or in flight, skipping"
                );
                return Outcome::AlreadyPosted;
            }
        }

        let outcome = self.run_attempts(channel_id, post_id, text).await;

        let mut ledger = self.ledger.lock().await;
        if matches!(outcome, Outcome::Succeeded { .. }) {
            ledger.posted.insert(post_id);
        }
        ledger.inflight.remove(&post_id.get());
        outcome
    }

    async fn run_attempts(&self, channel_id: ChannelId, post_id: PostId, text: &str) -> Outcome {
        let mut attempt = AutomationAttempt {
            channel_id,
            post_id,
            attempts: 0,
            last_error: None,
        };

        loop {
            attempt.attempts += 1;
            match self.poster.attach_comment(channel_id, post_id, text).await {
                Ok(()) => {
                    info!(
                        channel_id = channel_id.get(),
                        post_id = post_id.get(),
                        attempts = attempt.attempts,
                        "first comment attached"
                    );
                    return Outcome::Succeeded {
                        attempts: attempt.attempts,
                    };
                },
                Err(err) if err.is_transient() && attempt.attempts < self.policy.max_attempts => {
                    // A rate-limit hint from the platform overrides the
                    // computed backoff.
                    let wait = match &err {
                        PostError::RateLimited {
                            retry_after: Some(hint),
                        } => *hint,
                        _ => self.policy.delay_for(attempt.attempts),
                    };
                    warn!(
                        channel_id = channel_id.get(),
                        post_id = post_id.get(),
                        attempt = attempt.attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying after backoff"
                    );
                    attempt.last_error = Some(err.to_string());

                    tokio::select! {
                        () = self.shutdown.cancelled() => {
                            warn!(
                                channel_id = channel_id.get(),
                                post_id = post_id.get(),
                                attempts = attempt.attempts,
                                last_error = attempt.last_error.as_deref().unwrap_or(""),
                                "shutting down, abandoning dispatch"
                            );
                            return Outcome::Abandoned { attempts: attempt.attempts };
                        },
                        () = tokio::time::sleep(wait) => {},
                    }
                },
                Err(err) => {
                    let reason = err.to_string();
                    if err.is_transient() {
                        warn!(
                            channel_id = channel_id.get(),
                            post_id = post_id.get(),
                            attempts = attempt.attempts,
                            error = %reason,
                            "retries exhausted, giving up"
                        );
                    } else {
                        warn!(
                            channel_id = channel_id.get(),
                            post_id = post_id.get(),
                            error = %reason,
                            "permanent failure, not retrying"
                        );
                    }
                    self.notifier
                        .notify_failure(channel_id, post_id, &reason)
                        .await;
                    return Outcome::FailedTerminal {
                        attempts: attempt.attempts,
                        reason,
                    };
                },
            }
        }
    }
}
