//! End-to-end pipeline: an operator configures the first comment through
//! the menu, a channel post arrives, and the dispatcher attaches the
//! configured text exactly once.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use {
    firstmate_automation::{
        ChannelEventProcessor, CommentDispatcher, CommentPoster, FailureNotifier, Outcome,
        PostError, RetryPolicy,
    },
    firstmate_common::{ChannelId, OperatorId, PostId},
    firstmate_menu::{ButtonAction, MenuReply, MenuResponse, MenuStateMachine},
    firstmate_settings::{SettingsStore, SqliteSettingsStore},
};

const CHANNEL: ChannelId = ChannelId(-1001234567890);
const OPERATOR: OperatorId = OperatorId(7);

struct RecordingPoster {
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl RecordingPoster {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommentPoster for RecordingPoster {
    async fn attach_comment(
        &self,
        _channel_id: ChannelId,
        _post_id: PostId,
        text: &str,
    ) -> Result<(), PostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct SilentNotifier;

#[async_trait]
impl FailureNotifier for SilentNotifier {
    async fn notify_failure(&self, _channel_id: ChannelId, _post_id: PostId, _reason: &str) {}
}

async fn sqlite_store() -> Arc<SqliteSettingsStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    SqliteSettingsStore::init(&pool).await.unwrap();
    Arc::new(SqliteSettingsStore::new(pool))
}

fn screen(response: MenuResponse) -> MenuReply {
    match response {
        MenuResponse::Screen(reply) => reply,
        MenuResponse::Notice(text) => panic!("expected screen, got notice: {text}"),
    }
}

fn pipeline(
    store: Arc<SqliteSettingsStore>,
    poster: Arc<RecordingPoster>,
) -> ChannelEventProcessor {
    let dispatcher = Arc::new(CommentDispatcher::new(
        poster,
        Arc::new(SilentNotifier),
        RetryPolicy::default(),
        CancellationToken::new(),
    ));
    ChannelEventProcessor::new(store, dispatcher)
}

#[tokio::test]
async fn menu_configured_channel_gets_exactly_one_first_comment() {
    let store = sqlite_store().await;

    // Operator: enable the automation, then set the comment text.
    let menu = MenuStateMachine::new(Arc::clone(&store) as Arc<dyn SettingsStore>, CHANNEL);
    let epoch = screen(menu.open(OPERATOR).await).epoch;
    screen(menu.on_button(OPERATOR, epoch, ButtonAction::OpenSettings).await);
    screen(
        menu.on_button(OPERATOR, epoch, ButtonAction::OpenChannelSettings)
            .await,
    );
    screen(menu.on_button(OPERATOR, epoch, ButtonAction::Toggle).await);
    screen(
        menu.on_button(OPERATOR, epoch, ButtonAction::ConfirmPending)
            .await,
    );
    screen(menu.on_button(OPERATOR, epoch, ButtonAction::Edit).await);
    screen(
        menu.on_text(OPERATOR, "Welcome! Discuss below.")
            .await
            .expect("active session"),
    );
    screen(
        menu.on_button(OPERATOR, epoch, ButtonAction::ConfirmPending)
            .await,
    );

    let config = store.get(CHANNEL).await.unwrap();
    assert!(config.is_active());
    assert_eq!(config.updated_by, Some(OPERATOR));

    // Channel: a new post arrives, then gets redelivered.
    let poster = Arc::new(RecordingPoster::new());
    let processor = pipeline(Arc::clone(&store), Arc::clone(&poster));

    let outcome = processor.on_new_post(CHANNEL, PostId(100)).await;
    assert_eq!(outcome, Some(Outcome::Succeeded { attempts: 1 }));
    assert_eq!(processor.on_new_post(CHANNEL, PostId(100)).await, None);

    assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *poster.texts.lock().unwrap(),
        vec!["Welcome! Discuss below.".to_string()]
    );
}

#[tokio::test]
async fn unconfigured_channel_posts_nothing() {
    let store = sqlite_store().await;
    let poster = Arc::new(RecordingPoster::new());
    let processor = pipeline(store, Arc::clone(&poster));

    assert_eq!(processor.on_new_post(CHANNEL, PostId(100)).await, None);
    assert_eq!(poster.calls.load(Ordering::SeqCst), 0);
}
