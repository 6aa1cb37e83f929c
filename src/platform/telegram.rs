use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::LinkPreviewOptions;
use tracing::{debug, error, info, warn};

use crate::platform::IncomingMessage;
use crate::relay::{self, Outbound, Scheduler};

/// Posts relayed messages through the Bot API, without link previews.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send(&self, destination: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(destination), text)
            .link_preview_options(no_preview())
            .await?;
        Ok(())
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Listen for posts in the source chats and hand them to the relay
pub async fn run(bot: Bot, scheduler: Arc<Scheduler>, source_channels: &[i64]) -> Result<()> {
    let me = bot
        .get_me()
        .await
        .context("Failed to authenticate with the Telegram Bot API")?;

    let sources: Arc<HashSet<i64>> = Arc::new(source_channels.iter().copied().collect());
    let post_sources = Arc::clone(&sources);

    // Channels deliver channel_post updates, groups deliver plain messages.
    let handler = dptree::entry()
        .branch(
            Update::filter_channel_post()
                .filter(move |msg: Message| post_sources.contains(&msg.chat.id.0))
                .endpoint(handle_message),
        )
        .branch(
            Update::filter_message()
                .filter(move |msg: Message| sources.contains(&msg.chat.id.0))
                .endpoint(handle_message),
        );

    info!("Bot started successfully as @{}", me.username());

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![scheduler])
        .default_handler(|upd| async move {
            debug!("Ignored update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("relay"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    warn!("Dispatcher stopped");
    Ok(())
}

async fn handle_message(msg: Message, scheduler: Arc<Scheduler>) -> ResponseResult<()> {
    let incoming = IncomingMessage {
        source: msg.chat.id.0,
        text: msg.text().or_else(|| msg.caption()).unwrap_or_default().to_string(),
    };

    // A panic while handling one post must not take the dispatcher down.
    let processed = AssertUnwindSafe(relay::process(&scheduler, &incoming))
        .catch_unwind()
        .await;
    match processed {
        Ok(outcome) => debug!("Handled post from {}: {:?}", incoming.source, outcome),
        Err(panic) => error!("Error in handler: {}", panic_message(panic.as_ref())),
    }

    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
