#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use sweep_signal_bot::config::{default_sessions, default_symbol_map, Config, StrategyConfig};
use sweep_signal_bot::error::Result;
use sweep_signal_bot::exchange::ReplayFeed;
use sweep_signal_bot::models::{Candle, Timeframe};
use sweep_signal_bot::notify::Notifier;

pub const OPERATOR: i64 = 1001;

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

/// UTC clock, SOLUSDT only, default strategy.
pub fn test_config() -> Config {
    Config {
        telegram_token: "test-token".to_string(),
        allowed_chat_ids: vec![OPERATOR, 1002],
        exchange_base_url: "http://127.0.0.1:9".to_string(),
        symbols: default_symbol_map(),
        btc_symbol: "BTCUSDT".to_string(),
        default_symbols: vec!["SOLUSDT".to_string()],
        timezone: chrono_tz::UTC,
        pulse_minute: 1,
        realtime_tf: Timeframe::M15,
        realtime_interval: 900,
        sessions: default_sessions(),
        strategy: StrategyConfig::default(),
        state_file: "unused.json".to_string(),
        log_level: "error".to_string(),
    }
}

pub fn bar(t_open: DateTime<Utc>, tf: Timeframe, ohlc: (f64, f64, f64, f64)) -> Candle {
    let (open, high, low, close) = ohlc;
    Candle {
        t_open,
        t_close: t_open + tf.as_chrono(),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

/// `n` quiet bars oscillating 99..101 around 100.
pub fn flat(start: DateTime<Utc>, tf: Timeframe, n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| bar(start + tf.as_chrono() * i as i32, tf, (100.0, 101.0, 99.0, 100.0)))
        .collect()
}

/// SOLUSDT and BTCUSDT history around 2024-01-15.
///
/// Yesterday's range is 99.6 - 110, hourly ATR is 2 and the trend EMA sits
/// at 100, so a long signal forms with entry 100.1, stop 98 and targets
/// 102.2 / 104.3 / 106.4. The hourly bars opened at 10:00, 11:00 and 12:00
/// then confirm it, tag TP1, stall below TP2, and run through TP2 and TP3.
pub fn scenario_feed() -> ReplayFeed {
    scenario_feed_with(&[
        ("10", (100.0, 103.0, 99.8, 102.5)),
        ("11", (102.5, 104.0, 102.0, 103.5)),
        ("12", (103.5, 107.0, 103.0, 106.8)),
        ("13", (106.8, 107.0, 106.5, 106.9)),
    ])
}

/// Same history as [`scenario_feed`], with the hourly bars from 10:00 on
/// given as `(hour, (open, high, low, close))`.
pub fn scenario_feed_with(session: &[(&str, (f64, f64, f64, f64))]) -> ReplayFeed {
    let feed = ReplayFeed::new(utc("2024-01-15T10:01:00Z"));

    let mut hourly = flat(utc("2024-01-12T00:00:00Z"), Timeframe::H1, 82);
    for &(hour, ohlc) in session {
        let t = utc(&format!("2024-01-15T{hour}:00:00Z"));
        hourly.push(bar(t, Timeframe::H1, ohlc));
    }
    feed.load("SOLUSDT", Timeframe::H1, hourly);

    feed.load(
        "SOLUSDT",
        Timeframe::D1,
        vec![
            bar(utc("2024-01-13T00:00:00Z"), Timeframe::D1, (100.0, 101.0, 99.0, 100.0)),
            bar(utc("2024-01-14T00:00:00Z"), Timeframe::D1, (100.0, 110.0, 99.6, 100.0)),
            bar(utc("2024-01-15T00:00:00Z"), Timeframe::D1, (100.0, 107.0, 99.0, 106.0)),
        ],
    );

    let quarter: Vec<Candle> = (0..8)
        .map(|i| {
            bar(
                utc("2024-01-15T09:00:00Z") + Duration::minutes(15 * i),
                Timeframe::M15,
                (100.2, 100.5, 100.0, 100.3),
            )
        })
        .collect();
    feed.load("SOLUSDT", Timeframe::M15, quarter);

    feed.load(
        "BTCUSDT",
        Timeframe::H1,
        flat(utc("2024-01-14T00:00:00Z"), Timeframe::H1, 40),
    );

    feed
}

/// Notifier that records instead of sending.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}
