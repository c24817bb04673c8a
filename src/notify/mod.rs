pub mod commands;
pub mod telegram;

pub use commands::CommandHandler;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;

/// Telegram rejects messages longer than this (in UTF-16 units; chars is a
/// safe lower bound for the text we produce).
const MAX_MESSAGE_CHARS: usize = 4000;

/// Outbound message sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<()>;
}

/// Text blocks produced by one tick, delivered as a single message when it
/// fits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationBatch {
    pub parts: Vec<String>,
}

impl NotificationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: impl Into<String>) {
        self.parts.push(part.into());
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn text(&self) -> String {
        self.parts.join("\n")
    }

    /// Joins parts into as few messages as possible without splitting a part.
    pub fn messages(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut current = String::new();
        for part in &self.parts {
            let len = current.chars().count() + part.chars().count() + 1;
            if !current.is_empty() && len > MAX_MESSAGE_CHARS {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(part);
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// `None` when nothing was produced.
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// Sends the batch to every recipient. Failures are logged, not retried.
pub async fn deliver(notifier: &dyn Notifier, recipients: &[i64], batch: &NotificationBatch) {
    let messages = batch.messages();
    for &chat_id in recipients {
        for text in &messages {
            if let Err(e) = notifier.send(chat_id, text).await {
                warn!(chat_id, error = %e, "Failed to send notification");
            }
        }
    }
    debug!(
        "Delivered {} message(s) to {} chat(s)",
        messages.len(),
        recipients.len()
    );
}
