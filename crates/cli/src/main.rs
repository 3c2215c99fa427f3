//! firstmate entry point: resolve configuration, open storage, wire the
//! menu and automation pipeline together, and run the Telegram polling loop
//! until shutdown.

use std::{str::FromStr, sync::Arc};

use {
    clap::Parser,
    secrecy::Secret,
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    firstmate_automation::{ChannelEventProcessor, CommentDispatcher, RetryPolicy},
    firstmate_common::{ChannelId, OperatorId},
    firstmate_menu::MenuStateMachine,
    firstmate_settings::{SettingsStore, SqliteSettingsStore},
    firstmate_telegram::{TelegramBotConfig, TelegramNotifier, TelegramPoster, bot},
};

#[derive(Parser)]
#[command(
    name = "firstmate",
    about = "First-comment automation bot for a Telegram channel"
)]
struct Cli {
    /// Bot token from @BotFather.
    #[arg(long, env = "FIRSTMATE_TOKEN", hide_env_values = true)]
    token: String,

    /// Chat id of the managed channel.
    #[arg(long, env = "FIRSTMATE_CHANNEL_ID", allow_hyphen_values = true)]
    channel_id: i64,

    /// Comma-separated operator user ids.
    #[arg(
        long,
        env = "FIRSTMATE_OPERATORS",
        value_delimiter = ',',
        required = true
    )]
    operators: Vec<i64>,

    /// SQLite database path.
    #[arg(long, env = "FIRSTMATE_DB", default_value = "firstmate.db")]
    db: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "firstmate starting");

    let config = TelegramBotConfig {
        token: Secret::new(cli.token.clone()),
        channel_id: ChannelId(cli.channel_id),
        operators: cli.operators.iter().copied().map(OperatorId).collect(),
        ..Default::default()
    };

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", cli.db))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    SqliteSettingsStore::init(&pool).await?;
    let store: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::new(pool));
    info!(db = %cli.db, "settings store ready");

    let shutdown = CancellationToken::new();

    let tg_bot = bot::build_bot(&config)?;
    let poster = Arc::new(TelegramPoster::new(tg_bot.clone()));
    let notifier = Arc::new(TelegramNotifier::new(
        tg_bot.clone(),
        config.operators.clone(),
    ));
    let dispatcher = Arc::new(CommentDispatcher::new(
        poster,
        notifier,
        RetryPolicy::default(),
        shutdown.clone(),
    ));
    let processor = Arc::new(ChannelEventProcessor::new(Arc::clone(&store), dispatcher));
    let menu = Arc::new(MenuStateMachine::new(Arc::clone(&store), config.channel_id));

    // Configuration is fully resolved before any event can arrive.
    let poll_handle =
        bot::start_polling(tg_bot, config, menu, processor, shutdown.clone()).await?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_shutdown.cancel();
        }
    });

    // Runs until ctrl-c cancels the token or the polling loop stops itself
    // (e.g. another instance took over the bot token).
    let _ = poll_handle.await;
    if !shutdown.is_cancelled() {
        warn!("polling loop exited on its own");
        shutdown.cancel();
    }

    info!("firstmate stopped");
    Ok(())
}
