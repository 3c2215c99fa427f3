use std::sync::Arc;

use {
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use {
    firstmate_common::{ChannelId, PostId},
    firstmate_settings::SettingsStore,
};

use crate::{
    dispatcher::{CommentDispatcher, Outcome},
    recent::RecentPosts,
};

/// Reacts to "new channel post" notifications.
///
/// The common case (automation off) is a single settings read. Redelivered
/// notifications for a post already seen are suppressed by a bounded
/// recently-seen set, so the transport redelivering an update never produces
/// a second comment.
pub struct ChannelEventProcessor {
    store: Arc<dyn SettingsStore>,
    dispatcher: Arc<CommentDispatcher>,
    seen: Mutex<RecentPosts>,
}

impl ChannelEventProcessor {
    pub fn new(store: Arc<dyn SettingsStore>, dispatcher: Arc<CommentDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            seen: Mutex::new(RecentPosts::with_defaults()),
        }
    }

    /// Handle one "new post published" notification.
    ///
    /// Returns the dispatch outcome, or `None` when no dispatch happened
    /// (automation inactive, duplicate delivery, or settings unavailable).
    pub async fn on_new_post(&self, channel_id: ChannelId, post_id: PostId) -> Option<Outcome> {
        let config = match self.store.get(channel_id).await {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    channel_id = channel_id.get(),
                    post_id = post_id.get(),
                    error = %err,
                    "settings read failed, post not processed"
                );
                return None;
            },
        };

        if !config.is_active() {
            debug!(
                channel_id = channel_id.get(),
                post_id = post_id.get(),
                "automation inactive, ignoring post"
            );
            return None;
        }

        {
            // Insert on first sight so in-flight and completed attempts are
            // both covered.
            let mut seen = self.seen.lock().await;
            if !seen.insert(post_id) {
                debug!(
                    channel_id = channel_id.get(),
                    post_id = post_id.get(),
                    "duplicate post notification suppressed"
                );
                return None;
            }
        }

        Some(
            self.dispatcher
                .dispatch(channel_id, post_id, &config.comment_text)
                .await,
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        tokio_util::sync::CancellationToken,
        firstmate_common::OperatorId,
        firstmate_settings::{ConfigUpdate, MemorySettingsStore},
    };

    use {
        super::*,
        crate::{
            dispatcher::RetryPolicy,
            poster::PostError,
            testutil::{MockNotifier, MockPoster},
        },
    };

    const CHANNEL: ChannelId = ChannelId(42);

    async fn store_with(enabled: bool, text: &str) -> Arc<MemorySettingsStore> {
        let store = Arc::new(MemorySettingsStore::new());
        store
            .update(
                CHANNEL,
                ConfigUpdate {
                    enabled,
                    comment_text: text.into(),
                },
                OperatorId(7),
            )
            .await
            .unwrap();
        store
    }

    fn processor(
        store: Arc<MemorySettingsStore>,
        poster: Arc<MockPoster>,
        notifier: Arc<MockNotifier>,
    ) -> ChannelEventProcessor {
        let dispatcher = Arc::new(CommentDispatcher::new(
            poster,
            notifier,
            RetryPolicy::default(),
            CancellationToken::new(),
        ));
        ChannelEventProcessor::new(store, dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn active_config_dispatches_the_configured_text() {
        let store = store_with(true, "Discuss below!").await;
        let poster = Arc::new(MockPoster::with_script(vec![Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        let outcome = p.on_new_post(CHANNEL, PostId(100)).await;
        assert_eq!(outcome, Some(Outcome::Succeeded { attempts: 1 }));
        assert_eq!(poster.calls(), 1);
        assert_eq!(poster.texts(), vec!["Discuss below!"]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_config_never_touches_the_dispatcher() {
        let store = store_with(false, "Discuss below!").await;
        let poster = Arc::new(MockPoster::with_script(vec![Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        assert_eq!(p.on_new_post(CHANNEL, PostId(101)).await, None);
        assert_eq!(poster.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_but_empty_text_is_inactive() {
        let store = store_with(true, "  ").await;
        let poster = Arc::new(MockPoster::with_script(vec![Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        assert_eq!(p.on_new_post(CHANNEL, PostId(102)).await, None);
        assert_eq!(poster.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_channel_is_a_cheap_no_op() {
        let store = Arc::new(MemorySettingsStore::new());
        let poster = Arc::new(MockPoster::with_script(vec![Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        assert_eq!(p.on_new_post(CHANNEL, PostId(103)).await, None);
        assert_eq!(poster.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_delivery_attaches_at_most_once() {
        let store = store_with(true, "hi").await;
        let poster = Arc::new(MockPoster::with_script(vec![Ok(()), Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        assert_eq!(
            p.on_new_post(CHANNEL, PostId(100)).await,
            Some(Outcome::Succeeded { attempts: 1 })
        );
        assert_eq!(p.on_new_post(CHANNEL, PostId(100)).await, None);
        assert_eq!(poster.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_posts_each_get_a_comment() {
        let store = store_with(true, "hi").await;
        let poster = Arc::new(MockPoster::with_script(vec![Ok(()), Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), notifier);

        p.on_new_post(CHANNEL, PostId(100)).await;
        p.on_new_post(CHANNEL, PostId(101)).await;
        assert_eq!(poster.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_drops_the_event_with_a_log() {
        let store = store_with(true, "hi").await;
        store.set_storage_failing(true);
        let poster = Arc::new(MockPoster::with_script(vec![Ok(())]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(Arc::clone(&store), Arc::clone(&poster), notifier);

        assert_eq!(p.on_new_post(CHANNEL, PostId(100)).await, None);
        assert_eq!(poster.calls(), 0);

        // The suppression set was not touched, so the post can be processed
        // once storage recovers and the platform redelivers.
        store.set_storage_failing(false);
        assert_eq!(
            p.on_new_post(CHANNEL, PostId(100)).await,
            Some(Outcome::Succeeded { attempts: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_is_reported_not_silent() {
        let store = store_with(true, "hi").await;
        let poster = Arc::new(MockPoster::with_script(vec![
            Err(PostError::PermissionDenied("bot was demoted".into())),
        ]));
        let notifier = Arc::new(MockNotifier::new());
        let p = processor(store, Arc::clone(&poster), Arc::clone(&notifier));

        let outcome = p.on_new_post(CHANNEL, PostId(100)).await;
        assert!(matches!(outcome, Some(Outcome::FailedTerminal { .. })));
        assert_eq!(notifier.count(), 1);
    }
}
