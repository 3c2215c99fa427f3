use std::sync::Arc;

use {
    teloxide::{
        prelude::*,
        types::{CallbackQuery, ChatId, MediaKind, Message, MessageKind},
    },
    tracing::{debug, warn},
};

use {
    firstmate_automation::ChannelEventProcessor,
    firstmate_common::{OperatorId, PostId},
    firstmate_menu::{ButtonAction, MenuResponse, MenuStateMachine},
};

use crate::{access, config::TelegramBotConfig, outbound::TelegramOutbound};

const NOT_OPERATOR_REPLY: &str = "This bot only talks to its operators.";
const HINT_REPLY: &str = "Send /menu to configure the first comment.";

/// Shared context for the polling loop's update handlers.
pub struct BotContext {
    pub config: TelegramBotConfig,
    pub menu: Arc<MenuStateMachine>,
    pub processor: Arc<ChannelEventProcessor>,
    pub outbound: TelegramOutbound,
}

/// Handle an inbound DM: operator commands and menu text input.
pub async fn handle_message(ctx: &Arc<BotContext>, msg: Message) -> anyhow::Result<()> {
    if !msg.chat.is_private() {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let operator = OperatorId(user.id.0 as i64);

    if let Err(reason) = access::check_operator(&ctx.config, operator) {
        warn!(user = operator.get(), %reason, "message from non-operator");
        ctx.outbound
            .send_text(msg.chat.id, NOT_OPERATOR_REPLY)
            .await?;
        return Ok(());
    }

    let Some(text) = extract_text(&msg) else {
        debug!(user = operator.get(), "ignoring non-text message");
        return Ok(());
    };

    let response = match text.trim() {
        "/start" | "/menu" => ctx.menu.open(operator).await,
        "/exit" | "/close" => ctx.menu.close(operator).await,
        text => match ctx.menu.on_text(operator, text).await {
            Some(response) => response,
            // No active session: point at the entry command.
            None => MenuResponse::Notice(HINT_REPLY.into()),
        },
    };

    deliver(ctx, msg.chat.id, response).await?;
    Ok(())
}

/// Handle a menu button press.
pub async fn handle_callback_query(
    ctx: &Arc<BotContext>,
    bot: &Bot,
    query: CallbackQuery,
) -> anyhow::Result<()> {
    // Answer first to dismiss the loading spinner.
    if let Err(err) = bot.answer_callback_query(&query.id).await {
        debug!(error = %err, "failed to answer callback query");
    }

    let operator = OperatorId(query.from.id.0 as i64);
    if let Err(reason) = access::check_operator(&ctx.config, operator) {
        warn!(user = operator.get(), %reason, "callback from non-operator");
        return Ok(());
    }

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let response = match parse_callback(data) {
        Some((epoch, action)) => ctx.menu.on_button(operator, epoch, action).await,
        None => {
            warn!(user = operator.get(), data, "unparseable callback data");
            MenuResponse::Notice("This menu has expired. Send /menu to start again.".into())
        },
    };

    match (&query.message, response) {
        (Some(message), MenuResponse::Screen(reply)) => {
            // Edit the pressed menu in place; fall back to a fresh message.
            let chat = message.chat().id;
            if let Err(err) = ctx.outbound.edit_menu(chat, message.id(), &reply).await {
                debug!(error = %err, "menu edit failed, sending a new message");
                ctx.outbound.send_menu(chat, &reply).await?;
            }
        },
        (Some(message), MenuResponse::Notice(text)) => {
            ctx.outbound.send_text(message.chat().id, &text).await?;
        },
        (None, response) => {
            // The original message is gone; reply in the operator's DM.
            deliver(ctx, ChatId(operator.get()), response).await?;
        },
    }
    Ok(())
}

/// Handle a new post in the managed channel.
pub async fn handle_channel_post(ctx: &Arc<BotContext>, post: Message) -> anyhow::Result<()> {
    let channel_id = ctx.config.channel_id;
    if post.chat.id != ChatId(channel_id.get()) {
        debug!(chat_id = post.chat.id.0, "ignoring post from unmanaged chat");
        return Ok(());
    }
    let post_id = PostId(i64::from(post.id.0));
    debug!(post_id = post_id.get(), "new channel post");

    // Spawned so a slow retry sequence never stalls the polling loop.
    let processor = Arc::clone(&ctx.processor);
    tokio::spawn(async move {
        processor.on_new_post(channel_id, post_id).await;
    });
    Ok(())
}

async fn deliver(
    ctx: &BotContext,
    chat: ChatId,
    response: MenuResponse,
) -> crate::error::Result<()> {
    match response {
        MenuResponse::Screen(reply) => {
            ctx.outbound.send_menu(chat, &reply).await?;
        },
        MenuResponse::Notice(text) => ctx.outbound.send_text(chat, &text).await?,
    }
    Ok(())
}

/// Parse `m:<epoch>:<action-code>` callback data.
fn parse_callback(data: &str) -> Option<(u64, ButtonAction)> {
    let rest = data.strip_prefix("m:")?;
    let (epoch, code) = rest.split_once(':')?;
    let epoch = epoch.parse().ok()?;
    Some((epoch, ButtonAction::from_code(code)?))
}

/// Extract plain text content from a message.
fn extract_text(msg: &Message) -> Option<&str> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(text) => Some(text.text.as_str()),
            _ => None,
        },
        _ => None,
    }
}
