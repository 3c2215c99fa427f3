use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::{EditMessageTextSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyParameters},
    },
    tracing::{debug, warn},
};

use {
    firstmate_automation::{CommentPoster, FailureNotifier, PostError},
    firstmate_common::{ChannelId, OperatorId, PostId},
    firstmate_menu::MenuReply,
};

use crate::error::Result;

/// Attaches first comments by sending a reply to the channel post.
pub struct TelegramPoster {
    bot: Bot,
}

impl TelegramPoster {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl CommentPoster for TelegramPoster {
    async fn attach_comment(
        &self,
        channel_id: ChannelId,
        post_id: PostId,
        text: &str,
    ) -> std::result::Result<(), PostError> {
        // Telegram message ids are i32; a post id outside that range cannot
        // name a real post.
        let Ok(message_id) = i32::try_from(post_id.get()) else {
            return Err(PostError::NotFound);
        };

        self.bot
            .send_message(ChatId(channel_id.get()), text)
            .reply_parameters(ReplyParameters::new(MessageId(message_id)))
            .await
            .map_err(map_request_error)?;

        debug!(
            channel_id = channel_id.get(),
            post_id = post_id.get(),
            "comment sent"
        );
        Ok(())
    }
}

/// Delivers terminal dispatch failures to every configured operator.
pub struct TelegramNotifier {
    bot: Bot,
    operators: Vec<OperatorId>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, operators: Vec<OperatorId>) -> Self {
        Self { bot, operators }
    }
}

#[async_trait]
impl FailureNotifier for TelegramNotifier {
    async fn notify_failure(&self, channel_id: ChannelId, post_id: PostId, reason: &str) {
        let text = format!(
            "⚠ Could not attach the first comment to post {post_id} in channel {channel_id}: {reason}"
        );
        for operator in &self.operators {
            if let Err(err) = self
                .bot
                .send_message(ChatId(operator.get()), &text)
                .await
            {
                warn!(
                    operator = operator.get(),
                    error = %err,
                    "failed to deliver failure notification"
                );
            }
        }
    }
}

/// Outbound menu rendering: sends and edits the operator's menu message.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_text(&self, chat: ChatId, text: &str) -> Result<()> {
        self.bot.send_message(chat, text).await?;
        Ok(())
    }

    /// Send a fresh menu message.
    pub async fn send_menu(&self, chat: ChatId, reply: &MenuReply) -> Result<MessageId> {
        // Plain text: the menu previews operator-typed comment text, which
        // must never be interpreted as markup.
        let message = self
            .bot
            .send_message(chat, &reply.text)
            .reply_markup(keyboard_markup(reply))
            .await?;
        Ok(message.id)
    }

    /// Replace an existing menu message in place.
    ///
    /// An unchanged rendering ("message is not modified") is not an error.
    pub async fn edit_menu(
        &self,
        chat: ChatId,
        message_id: MessageId,
        reply: &MenuReply,
    ) -> Result<()> {
        let result = self
            .bot
            .edit_message_text(chat, message_id, &reply.text)
            .reply_markup(keyboard_markup(reply))
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Encode a menu keyboard as Telegram inline buttons.
///
/// Callback data format: `m:<epoch>:<action-code>`.
fn keyboard_markup(reply: &MenuReply) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(reply.keyboard.iter().map(|row| {
        row.iter().map(|button| {
            InlineKeyboardButton::callback(
                button.label.clone(),
                format!("m:{}:{}", reply.epoch, button.action.code()),
            )
        })
    }))
}

/// Map a teloxide request failure onto the dispatch error taxonomy.
pub(crate) fn map_request_error(err: RequestError) -> PostError {
    match err {
        RequestError::RetryAfter(wait) => PostError::RateLimited {
            retry_after: Some(wait.duration()),
        },
        RequestError::Network(err) if err.is_timeout() => PostError::Timeout,
        RequestError::Network(err) => PostError::Network(err.to_string()),
        RequestError::Io(err) => PostError::Network(err.to_string()),
        RequestError::Api(api) => map_api_error(api),
        other => PostError::Network(other.to_string()),
    }
}

fn map_api_error(err: ApiError) -> PostError {
    match err {
        ApiError::MessageToReplyNotFound | ApiError::MessageIdInvalid | ApiError::ChatNotFound => {
            PostError::NotFound
        },
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::NotEnoughRightsToPostMessages => PostError::PermissionDenied(err.to_string()),
        ApiError::MessageIsTooLong | ApiError::CantParseEntities(_) => {
            PostError::InvalidContent(err.to_string())
        },
        other => PostError::Rejected(other.to_string()),
    }
}
