use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {firstmate_automation::ChannelEventProcessor, firstmate_menu::MenuStateMachine};

use crate::{
    config::TelegramBotConfig,
    handlers::{self, BotContext},
    outbound::TelegramOutbound,
};

/// Build a bot with an HTTP client timeout longer than the long-polling
/// timeout, so the client doesn't abort the request before Telegram
/// responds.
pub fn build_bot(config: &TelegramBotConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(
            u64::from(config.poll_timeout_secs) + 15,
        ))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Start the long-polling loop.
///
/// Verifies credentials before returning, so event intake never begins with
/// an unusable token. The spawned loop runs until `shutdown` fires or
/// another instance takes over the token.
pub async fn start_polling(
    bot: Bot,
    config: TelegramBotConfig,
    menu: Arc<MenuStateMachine>,
    processor: Arc<ChannelEventProcessor>,
    shutdown: CancellationToken,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let me = bot.get_me().await?;
    info!(username = ?me.username, "telegram bot connected");

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    // Register slash commands for autocomplete in Telegram clients.
    let commands = vec![
        BotCommand::new("menu", "Open the settings menu"),
        BotCommand::new("exit", "Close the settings menu"),
    ];
    if let Err(err) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {err}");
    }

    let poll_timeout = config.poll_timeout_secs;
    let ctx = Arc::new(BotContext {
        config,
        menu,
        processor,
        outbound: TelegramOutbound::new(bot.clone()),
    });

    let handle = tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if shutdown.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = tokio::select! {
                () = shutdown.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(poll_timeout)
                    .allowed_updates(vec![
                        AllowedUpdate::Message,
                        AllowedUpdate::ChannelPost,
                        AllowedUpdate::CallbackQuery,
                    ])
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                if let Err(err) = handlers::handle_message(&ctx, msg).await {
                                    error!(error = %err, "error handling telegram message");
                                }
                            },
                            UpdateKind::CallbackQuery(query) => {
                                if let Err(err) =
                                    handlers::handle_callback_query(&ctx, &bot, query).await
                                {
                                    error!(error = %err, "error handling telegram callback query");
                                }
                            },
                            UpdateKind::ChannelPost(post) => {
                                if let Err(err) = handlers::handle_channel_post(&ctx, post).await {
                                    error!(error = %err, "error handling channel post");
                                }
                            },
                            other => {
                                debug!("ignoring update: {other:?}");
                            },
                        }
                    }
                },
                Err(err) => {
                    // Another instance holds this token; polling cannot continue.
                    if matches!(&err, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        error!(
                            "telegram polling stopped: another instance is already running with this token"
                        );
                        break;
                    }

                    warn!(error = %err, "telegram getUpdates failed");
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(std::time::Duration::from_secs(5)) => {},
                    }
                },
            }
        }
    });

    Ok(handle)
}
