mod config;
mod extract;
mod health;
mod platform;
mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::platform::telegram::{self, TelegramOutbound};
use crate::relay::{RelaySink, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging: console plus bot.log
    let (log_file, _log_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", "bot.log"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,redpacket_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(log_file),
        )
        .init();

    // A config path on the command line wins over the environment
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Config::from_env().context("Failed to load config from environment"),
    }
    .inspect_err(|e| error!("{:#}", e))?;

    info!("Configuration loaded successfully");
    info!("  API ID: {}", config.telegram.api_id);
    info!("  Source channels: {:?}", config.relay.source_channels);
    info!("  Target channels: {:?}", config.relay.target_channels);
    info!("  Queue delay: {}s", config.relay.queue_delay);
    info!("  Rate limit: {}s", config.relay.rate_limit);
    info!("  Health port: {}", config.health.port);

    let port = config.health.port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            error!("{:#}", e);
        }
    });

    let bot = teloxide::Bot::new(&config.telegram.bot_token);
    let sink = RelaySink::new(
        Arc::new(TelegramOutbound::new(bot.clone())),
        config.relay.target_channels.clone(),
    );
    let scheduler = Arc::new(Scheduler::new(
        sink,
        config.relay.rate_limit(),
        config.relay.queue_delay(),
    ));

    info!("Bot is starting...");
    telegram::run(bot, scheduler, &config.relay.source_channels).await?;

    Ok(())
}
