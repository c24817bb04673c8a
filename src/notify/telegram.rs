use async_trait::async_trait;
use std::sync::Arc;
use teloxide::{dispatching::UpdateHandler, prelude::*};
use tracing::{debug, info};

use crate::error::{BotError, Result};
use crate::notify::{CommandHandler, Notifier};

type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Notifier backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(recipient), text)
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Long-poll for operator messages until the task is cancelled.
pub async fn run_dispatcher(bot: Bot, handler: Arc<CommandHandler>) {
    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![handler])
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message().endpoint(on_message)
}

async fn on_message(bot: Bot, msg: Message, handler: Arc<CommandHandler>) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    debug!(chat_id = msg.chat.id.0, "Incoming: {}", text);

    if let Some(reply) = handler.handle(msg.chat.id.0, text).await {
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}
