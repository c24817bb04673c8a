use std::sync::Arc;
use tracing::{error, info, warn};

use crate::engine::SignalEngine;
use crate::error::Result;

const HELP: &str = "Commands: /status, /pulse, /add_symbol, /remove_symbol, /stop";

/// Operator commands. Transport-agnostic: takes the chat id and raw text,
/// returns the reply (if any).
pub struct CommandHandler {
    engine: Arc<SignalEngine>,
}

impl CommandHandler {
    pub fn new(engine: Arc<SignalEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle(&self, chat_id: i64, text: &str) -> Option<String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("ping") {
            return Some("pong".to_string());
        }

        let mut words = text.split_whitespace();
        let command = words.next()?.strip_prefix('/')?;
        // Group chats address commands as /cmd@BotName
        let command = command.split('@').next().unwrap_or(command).to_lowercase();
        let arg = words.next();

        if command == "id" {
            return Some(format!("🆔 chat_id = {chat_id}"));
        }

        if !self.engine.config().is_allowed(chat_id) {
            warn!(chat_id, "Unauthorized command /{}", command);
            return None;
        }

        let reply = match command.as_str() {
            "start" => self.set_enabled(true).map(|_| format!("▶️ Bot started. {HELP}")),
            "stop" => self.set_enabled(false).map(|_| "⏸ Paused. /start to resume".to_string()),
            "status" => self.status(),
            "pulse" => Ok(self.pulse().await),
            "add_symbol" => self.add_symbol(arg),
            "remove_symbol" => self.remove_symbol(arg),
            _ => return None,
        };

        Some(reply.unwrap_or_else(|e| {
            error!("Command /{} failed: {}", command, e);
            format!("⚠️ /{command} failed: {e}")
        }))
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let store = self.engine.store();
        let mut state = self.engine.bot_state()?;
        state.enabled = enabled;
        state.save(store)?;
        info!("Bot {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    fn status(&self) -> Result<String> {
        let state = self.engine.bot_state()?;
        let book = self.engine.signal_book()?;
        let symbols = if state.monitored_symbols.is_empty() {
            "none".to_string()
        } else {
            state.monitored_symbols.join(", ")
        };
        Ok(format!(
            "🤖 enabled={}\nMonitored symbols: {}\nActive signals: {}",
            state.enabled,
            symbols,
            book.len()
        ))
    }

    async fn pulse(&self) -> String {
        let tz = self.engine.config().timezone;
        let at = self.engine.next_pulse().await.with_timezone(&tz);
        format!("🕐 Next pulse: {}", at.format("%Y-%m-%d %H:%M:%S (%Z)"))
    }

    fn add_symbol(&self, arg: Option<&str>) -> Result<String> {
        let Some(symbol) = arg.map(str::to_uppercase) else {
            return Ok("Usage: /add_symbol <symbol> (e.g. SOLUSDT)".to_string());
        };
        let config = self.engine.config();
        if let Err(e) = config.instrument(&symbol) {
            let supported: Vec<&str> = config.symbols.keys().map(String::as_str).collect();
            return Ok(format!("🚫 {e}. Supported: {}", supported.join(", ")));
        }

        let mut state = self.engine.bot_state()?;
        if state.monitored_symbols.contains(&symbol) {
            return Ok(format!("ℹ️ {symbol} is already monitored"));
        }
        state.monitored_symbols.push(symbol.clone());
        state.save(self.engine.store())?;
        info!("Monitoring {}", symbol);
        Ok(format!("✅ Added {symbol}"))
    }

    fn remove_symbol(&self, arg: Option<&str>) -> Result<String> {
        let Some(symbol) = arg.map(str::to_uppercase) else {
            return Ok("Usage: /remove_symbol <symbol>".to_string());
        };
        let mut state = self.engine.bot_state()?;
        let before = state.monitored_symbols.len();
        state.monitored_symbols.retain(|s| s != &symbol);
        if state.monitored_symbols.len() == before {
            return Ok(format!("ℹ️ {symbol} is not monitored"));
        }
        state.save(self.engine.store())?;
        info!("Stopped monitoring {}", symbol);
        Ok(format!("✅ Removed {symbol}"))
    }
}
