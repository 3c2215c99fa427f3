use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use {
    firstmate_common::{ChannelId, OperatorId},
    firstmate_settings::{ChannelConfig, ConfigUpdate, Error as SettingsError, SettingsStore},
};

use crate::{
    action::ButtonAction,
    node::MenuNode,
    session::{OperatorSession, PendingChange},
    view::{self, MenuReply},
};

/// Sessions idle longer than this are pruned on the owner's next event.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const EXPIRED_NOTICE: &str = "This menu has expired. Send /menu to start again.";
const CLOSED_NOTICE: &str = "Menu closed. Send /menu to reopen.";
const STORAGE_NOTICE: &str = "Storage is unavailable right now, please try again later.";

enum Gate {
    Live,
    Missing,
    Idle,
    Stale,
}

/// What the transport should show the operator after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuResponse {
    /// Render (or re-render) a menu screen with its keyboard.
    Screen(MenuReply),
    /// Plain text without a keyboard.
    Notice(String),
}

/// One operator's session slot. `None` after exit or expiry.
type SessionSlot = Arc<Mutex<Option<OperatorSession>>>;

/// Per-operator menu navigation over the fixed screen tree.
///
/// Owns every [`OperatorSession`]; callers never touch session state
/// directly. Events are sequenced per operator: the slot mutex is held for
/// the whole event, so one operator's session mutation is driven to
/// completion before their next action is admitted, while other operators
/// proceed concurrently. The outer map lock is never held across an await.
pub struct MenuStateMachine {
    store: Arc<dyn SettingsStore>,
    channel_id: ChannelId,
    sessions: Mutex<HashMap<i64, SessionSlot>>,
    next_epoch: AtomicU64,
    idle_timeout: Duration,
}

impl MenuStateMachine {
    pub fn new(store: Arc<dyn SettingsStore>, channel_id: ChannelId) -> Self {
        Self::with_idle_timeout(store, channel_id, SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        store: Arc<dyn SettingsStore>,
        channel_id: ChannelId,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            channel_id,
            sessions: Mutex::new(HashMap::new()),
            next_epoch: AtomicU64::new(0),
            idle_timeout,
        }
    }

    /// Open (or reopen) the menu at the root screen.
    ///
    /// Always starts a fresh session with a new epoch, so keyboards rendered
    /// for any earlier session stop working.
    pub async fn open(&self, operator: OperatorId) -> MenuResponse {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let reply = view::render(
            MenuNode::Root,
            &ChannelConfig::disabled(self.channel_id),
            None,
            epoch,
        );
        let slot = self.slot(operator).await;
        *slot.lock().await = Some(OperatorSession::new(operator, epoch));
        debug!(operator = operator.get(), epoch, "menu session opened");
        MenuResponse::Screen(reply)
    }

    /// Close the operator's session, if any.
    pub async fn close(&self, operator: OperatorId) -> MenuResponse {
        if let Some(slot) = self.existing_slot(operator).await {
            *slot.lock().await = None;
        }
        MenuResponse::Notice(CLOSED_NOTICE.into())
    }

    /// Handle a button press from a rendered keyboard.
    ///
    /// `epoch` is the token embedded in the keyboard at render time; a
    /// mismatch means the press came from an expired rendering (pre-restart
    /// or from a reopened session) and is rejected without touching state.
    pub async fn on_button(
        &self,
        operator: OperatorId,
        epoch: u64,
        action: ButtonAction,
    ) -> MenuResponse {
        let Some(slot) = self.existing_slot(operator).await else {
            return MenuResponse::Notice(EXPIRED_NOTICE.into());
        };
        let mut guard = slot.lock().await;

        match self.gate(guard.as_ref(), operator, Some(epoch)) {
            Gate::Live => {},
            Gate::Idle => {
                debug!(operator = operator.get(), "pruning idle menu session");
                *guard = None;
                return MenuResponse::Notice(EXPIRED_NOTICE.into());
            },
            Gate::Missing | Gate::Stale => {
                return MenuResponse::Notice(EXPIRED_NOTICE.into());
            },
        }

        if action == ButtonAction::Exit {
            *guard = None;
            return MenuResponse::Notice(CLOSED_NOTICE.into());
        }

        let Some(session) = guard.as_mut() else {
            return MenuResponse::Notice(EXPIRED_NOTICE.into());
        };
        session.touch();

        let notice: Option<String> = match (session.node, action) {
            (MenuNode::Root, ButtonAction::OpenSettings) => {
                session.descend(MenuNode::Settings);
                None
            },
            (MenuNode::Settings, ButtonAction::OpenChannelSettings) => {
                session.descend(MenuNode::ChannelSettings);
                None
            },
            // Back at root is a no-op that stays at root.
            (MenuNode::Root, ButtonAction::Back) => None,
            (MenuNode::Settings | MenuNode::ChannelSettings, ButtonAction::Back) => {
                session.back();
                None
            },
            (MenuNode::ChannelSettings, ButtonAction::Toggle) => {
                match self.store.get(self.channel_id).await {
                    Ok(config) => {
                        session.pending = Some(PendingChange::SetEnabled(!config.enabled));
                        session.descend(MenuNode::Confirm);
                        None
                    },
                    Err(err) => {
                        warn!(operator = operator.get(), error = %err, "settings read failed");
                        return MenuResponse::Notice(STORAGE_NOTICE.into());
                    },
                }
            },
            (MenuNode::ChannelSettings, ButtonAction::Edit) => {
                session.descend(MenuNode::TextEditor);
                None
            },
            (MenuNode::TextEditor | MenuNode::Confirm, ButtonAction::Cancel) => {
                session.pending = None;
                session.unwind_to(MenuNode::ChannelSettings);
                Some("Cancelled.".into())
            },
            (MenuNode::Confirm, ButtonAction::ConfirmPending) => {
                match self.commit(session).await {
                    Ok(committed) => {
                        session.pending = None;
                        session.unwind_to(MenuNode::ChannelSettings);
                        Some(if committed { "Saved." } else { "Nothing to change." }.into())
                    },
                    Err(SettingsError::Validation { reason }) => {
                        // Send the operator back to the editor to try again.
                        session.pending = None;
                        session.back();
                        Some(format!("That text can't be used: {reason}"))
                    },
                    Err(err @ SettingsError::Storage(_)) => {
                        // Keep the staged change so Confirm can be retried.
                        warn!(operator = operator.get(), error = %err, "settings update failed");
                        return MenuResponse::Notice(STORAGE_NOTICE.into());
                    },
                }
            },
            (node, action) => {
                // A button from a screen the operator already left.
                warn!(
                    operator = operator.get(),
                    ?node,
                    ?action,
                    "menu action not valid for current screen, resetting session"
                );
                session.reset();
                Some("That button is no longer valid, starting over.".into())
            },
        };

        match self.render_session(session).await {
            Ok(reply) => MenuResponse::Screen(match notice {
                Some(notice) => reply.with_notice(notice),
                None => reply,
            }),
            Err(err) => {
                warn!(operator = operator.get(), error = %err, "settings read failed");
                MenuResponse::Notice(STORAGE_NOTICE.into())
            },
        }
    }

    /// Handle a free-text message from an operator.
    ///
    /// Returns `None` when the operator has no active session, so the
    /// transport can fall back to its usage hint.
    pub async fn on_text(&self, operator: OperatorId, text: &str) -> Option<MenuResponse> {
        let slot = self.existing_slot(operator).await?;
        let mut guard = slot.lock().await;

        match self.gate(guard.as_ref(), operator, None) {
            Gate::Live => {},
            Gate::Idle => {
                *guard = None;
                return Some(MenuResponse::Notice(EXPIRED_NOTICE.into()));
            },
            Gate::Missing | Gate::Stale => return None,
        }

        let session = guard.as_mut()?;
        session.touch();

        if !session.node.awaits_text() {
            return Some(MenuResponse::Notice(
                "I wasn't expecting a message here. Use the menu buttons.".into(),
            ));
        }

        let text = text.trim();
        if let Err(err) = firstmate_settings::config::validate_comment_text(text) {
            // Stay in the editor and re-prompt.
            return Some(match self.render_session(session).await {
                Ok(reply) => MenuResponse::Screen(reply.with_notice(err)),
                Err(err) => {
                    warn!(operator = operator.get(), error = %err, "settings read failed");
                    MenuResponse::Notice(STORAGE_NOTICE.into())
                },
            });
        }

        session.pending = Some(PendingChange::SetText(text.to_string()));
        session.descend(MenuNode::Confirm);

        Some(match self.render_session(session).await {
            Ok(reply) => MenuResponse::Screen(reply),
            Err(err) => {
                warn!(operator = operator.get(), error = %err, "settings read failed");
                MenuResponse::Notice(STORAGE_NOTICE.into())
            },
        })
    }

    /// Resolve the staged change into a full-field update and write it.
    /// Returns whether anything was actually committed.
    async fn commit(&self, session: &OperatorSession) -> Result<bool, SettingsError> {
        let Some(pending) = session.pending.clone() else {
            return Ok(false);
        };
        let current = self.store.get(self.channel_id).await?;
        let update = match pending {
            PendingChange::SetEnabled(enabled) => ConfigUpdate {
                enabled,
                comment_text: current.comment_text,
            },
            PendingChange::SetText(comment_text) => ConfigUpdate {
                enabled: current.enabled,
                comment_text,
            },
        };
        self.store
            .update(self.channel_id, update, session.operator_id)
            .await?;
        Ok(true)
    }

    /// Fetch (or create) the operator's session slot. The map lock is held
    /// only for the lookup, never across an await.
    async fn slot(&self, operator: OperatorId) -> SessionSlot {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(sessions.entry(operator.get()).or_default())
    }

    async fn existing_slot(&self, operator: OperatorId) -> Option<SessionSlot> {
        let sessions = self.sessions.lock().await;
        sessions.get(&operator.get()).map(Arc::clone)
    }

    /// Check a session's liveness before mutating it.
    fn gate(
        &self,
        session: Option<&OperatorSession>,
        operator: OperatorId,
        epoch: Option<u64>,
    ) -> Gate {
        let Some(session) = session else {
            return Gate::Missing;
        };
        if session.is_idle(self.idle_timeout) {
            return Gate::Idle;
        }
        if let Some(epoch) = epoch
            && session.epoch != epoch
        {
            debug!(
                operator = operator.get(),
                stale = epoch,
                current = session.epoch,
                "ignoring press from stale keyboard"
            );
            return Gate::Stale;
        }
        Gate::Live
    }

    async fn render_session(&self, session: &OperatorSession) -> Result<MenuReply, SettingsError> {
        // Root and Settings don't show channel state; skip the read there.
        let config = match session.node {
            MenuNode::Root | MenuNode::Settings => ChannelConfig::disabled(self.channel_id),
            _ => self.store.get(self.channel_id).await?,
        };
        Ok(view::render(
            session.node,
            &config,
            session.pending.as_ref(),
            session.epoch,
        ))
    }

    #[cfg(test)]
    async fn node_of(&self, operator: OperatorId) -> Option<MenuNode> {
        let slot = self.existing_slot(operator).await?;
        let node = slot.lock().await.as_ref().map(|s| s.node);
        node
    }

    #[cfg(test)]
    async fn depth_of(&self, operator: OperatorId) -> Option<usize> {
        let slot = self.existing_slot(operator).await?;
        let depth = slot.lock().await.as_ref().map(|s| s.depth());
        depth
    }

    #[cfg(test)]
    async fn backdate(&self, operator: OperatorId, by: Duration) {
        if let Some(slot) = self.existing_slot(operator).await {
            if let Some(session) = slot.lock().await.as_mut() {
                session.backdate(by);
            }
        }
    }
}
