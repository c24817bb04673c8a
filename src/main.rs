mod bot;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use sweep_signal_bot::config::Config;
use sweep_signal_bot::engine::SignalEngine;
use sweep_signal_bot::exchange::BybitClient;
use sweep_signal_bot::storage::JsonFileStore;

use crate::bot::SignalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let feed = Arc::new(BybitClient::new(&cfg)?);
    let store = Arc::new(JsonFileStore::new(&cfg.state_file));
    let telegram = teloxide::Bot::new(cfg.telegram_token.clone());

    let engine = Arc::new(SignalEngine::new(Arc::new(cfg), feed, store));

    SignalBot::new(engine, telegram).run().await
}
