//! Test doubles shared by the dispatcher and processor tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use firstmate_common::{ChannelId, PostId};

use crate::poster::{CommentPoster, FailureNotifier, PostError};

/// Scripted poster: returns the queued results in order and records every
/// call. An exhausted script times out, which keeps a miscounted test loud.
pub struct MockPoster {
    script: Mutex<VecDeque<Result<(), PostError>>>,
    texts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    cancel_on_first: Option<CancellationToken>,
}

impl MockPoster {
    pub fn with_script(script: Vec<Result<(), PostError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            texts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            cancel_on_first: None,
        }
    }

    /// Cancel `token` as a side effect of the first transport call.
    pub fn cancel_on_first_call(mut self, token: CancellationToken) -> Self {
        self.cancel_on_first = Some(token);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CommentPoster for MockPoster {
    async fn attach_comment(
        &self,
        _channel_id: ChannelId,
        _post_id: PostId,
        text: &str,
    ) -> Result<(), PostError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        if call == 0
            && let Some(token) = &self.cancel_on_first
        {
            token.cancel();
        }
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Err(PostError::Timeout))
    }
}

/// Records terminal failure notifications.
pub struct MockNotifier {
    reasons: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            reasons: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.reasons.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl FailureNotifier for MockNotifier {
    async fn notify_failure(&self, channel_id: ChannelId, post_id: PostId, reason: &str) {
        self.reasons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{channel_id}/{post_id}: {reason}"));
    }
}
