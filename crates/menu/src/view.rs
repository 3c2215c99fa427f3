//! Screen rendering: node state to text plus button grid.
//!
//! The transport adapter turns a [`MenuReply`] into platform keyboards; this
//! module knows nothing about Telegram markup.

use firstmate_settings::ChannelConfig;

use crate::{action::ButtonAction, node::MenuNode, session::PendingChange};

const TEXT_PREVIEW_LEN: usize = 120;

/// One inline button: a label and the action its press triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    pub action: ButtonAction,
}

impl MenuButton {
    fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// A rendered menu screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuReply {
    pub text: String,
    /// Rows of buttons, rendered top to bottom.
    pub keyboard: Vec<Vec<MenuButton>>,
    /// Session epoch to embed in callback data.
    pub epoch: u64,
}

impl MenuReply {
    /// Prepend a one-line notice (validation feedback, commit result) above
    /// the screen body.
    #[must_use]
    pub fn with_notice(mut self, notice: impl std::fmt::Display) -> Self {
        self.text = format!("{notice}\n\n{}", self.text);
        self
    }
}

/// Render a menu node against the current channel settings.
#[must_use]
pub fn render(
    node: MenuNode,
    config: &ChannelConfig,
    pending: Option<&PendingChange>,
    epoch: u64,
) -> MenuReply {
    let (text, keyboard) = match node {
        MenuNode::Root => (
            "What would you like to manage?".to_string(),
            vec![
                vec![MenuButton::new("⚙ Settings", ButtonAction::OpenSettings)],
                vec![MenuButton::new("Close", ButtonAction::Exit)],
            ],
        ),
        MenuNode::Settings => (
            "Settings".to_string(),
            vec![
                vec![MenuButton::new(
                    "💬 First comment",
                    ButtonAction::OpenChannelSettings,
                )],
                vec![MenuButton::new("← Back", ButtonAction::Back)],
            ],
        ),
        MenuNode::ChannelSettings => {
            let status = if config.is_active() {
                "on"
            } else if config.enabled {
                "on, but the text is empty so nothing is posted"
            } else {
                "off"
            };
            let text = format!(
                "First comment automation is {status}.\nText: {}",
                preview(&config.comment_text)
            );
            let toggle_label = if config.enabled {
                "Turn off"
            } else {
                "Turn on"
            };
            (
                text,
                vec![
                    vec![MenuButton::new(toggle_label, ButtonAction::Toggle)],
                    vec![MenuButton::new("✏ Edit text", ButtonAction::Edit)],
                    vec![MenuButton::new("← Back", ButtonAction::Back)],
                ],
            )
        },
        MenuNode::TextEditor => (
            format!(
                "Send the new first-comment text as a message.\nCurrent text: {}",
                preview(&config.comment_text)
            ),
            vec![vec![MenuButton::new("Cancel", ButtonAction::Cancel)]],
        ),
        MenuNode::Confirm => {
            let text = match pending {
                Some(PendingChange::SetEnabled(true)) => {
                    "Turn the first-comment automation on?".to_string()
                },
                Some(PendingChange::SetEnabled(false)) => {
                    "Turn the first-comment automation off?".to_string()
                },
                Some(PendingChange::SetText(new_text)) => {
                    format!("Use this first-comment text?\n\n{}", preview(new_text))
                },
                // A confirm screen with nothing staged has nothing to apply.
                None => "Nothing to confirm.".to_string(),
            };
            (
                text,
                vec![vec![
                    MenuButton::new("✅ Confirm", ButtonAction::ConfirmPending),
                    MenuButton::new("Cancel", ButtonAction::Cancel),
                ]],
            )
        },
    };

    MenuReply {
        text,
        keyboard,
        epoch,
    }
}

fn preview(text: &str) -> String {
    if text.trim().is_empty() {
        return "(not set)".to_string();
    }
    let mut out: String = text.chars().take(TEXT_PREVIEW_LEN).collect();
    if text.chars().count() > TEXT_PREVIEW_LEN {
        out.push('…');
    }
    out
}
