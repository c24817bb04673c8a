use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use sweep_signal_bot::core::sessions::SessionManager;
use sweep_signal_bot::engine::schedule::until;
use sweep_signal_bot::engine::SignalEngine;
use sweep_signal_bot::notify::telegram::run_dispatcher;
use sweep_signal_bot::notify::{deliver, CommandHandler, Notifier, TelegramNotifier};

/// Delay before the first realtime check after startup.
const REALTIME_WARMUP: Duration = Duration::from_secs(10);

pub struct SignalBot {
    engine: Arc<SignalEngine>,
    telegram: Bot,
}

impl SignalBot {
    pub fn new(engine: Arc<SignalEngine>, telegram: Bot) -> Self {
        let cfg = engine.config();

        info!("{}", "=".repeat(60));
        info!("Sweep signal bot starting up");
        info!("Timezone: {} | pulse at :{:02}", cfg.timezone, cfg.pulse_minute);
        info!(
            "Realtime: {} every {}s",
            cfg.realtime_tf, cfg.realtime_interval
        );
        info!("Default symbols: {}", cfg.default_symbols.join(", "));
        info!(
            "Partials: {} | RR: {:?} | FVG filter: {} | sweep block: {}",
            cfg.strategy.partial_scheme,
            cfg.strategy.rr_tp,
            cfg.strategy.fvg_required,
            cfg.strategy.sweep_block
        );
        info!("Allowed chats: {}", cfg.allowed_chat_ids.len());
        let sessions = SessionManager::new(cfg);
        info!(
            "Session: {}",
            sessions.current_session(Utc::now()).unwrap_or("off-session")
        );
        info!("{}", "=".repeat(60));

        Self { engine, telegram }
    }

    pub async fn run(self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");

        let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(self.telegram.clone()));
        let handler = Arc::new(CommandHandler::new(self.engine.clone()));

        let hourly = tokio::spawn(hourly_loop(self.engine.clone(), notifier.clone()));
        let realtime = tokio::spawn(realtime_loop(self.engine.clone(), notifier));
        let mut commands = tokio::spawn(run_dispatcher(self.telegram, handler));

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("Shutting down...");
            }
            _ = &mut commands => {
                error!("Telegram dispatcher stopped");
            }
        }

        hourly.abort();
        realtime.abort();
        commands.abort();
        info!("Bot stopped.");
        Ok(())
    }
}

async fn hourly_loop(engine: Arc<SignalEngine>, notifier: Arc<dyn Notifier>) {
    loop {
        let next = engine.next_pulse().await;
        tokio::time::sleep(until(next, Utc::now())).await;

        match engine.hourly_pulse().await {
            Ok(Some(batch)) => {
                deliver(notifier.as_ref(), &engine.config().allowed_chat_ids, &batch).await
            }
            Ok(None) => {}
            Err(e) => error!("Hourly pulse failed: {}", e),
        }
    }
}

async fn realtime_loop(engine: Arc<SignalEngine>, notifier: Arc<dyn Notifier>) {
    let period = Duration::from_secs(engine.config().realtime_interval.max(1));
    let mut ticker = interval_at(Instant::now() + REALTIME_WARMUP, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match engine.realtime_monitor().await {
            Ok(Some(batch)) => {
                deliver(notifier.as_ref(), &engine.config().allowed_chat_ids, &batch).await
            }
            Ok(None) => {}
            Err(e) => error!("Realtime monitor failed: {}", e),
        }
    }
}
