use chrono::{DateTime, Duration, Utc};

use crate::config::{default_sessions, default_symbol_map, Config, StrategyConfig};
use crate::models::{Candle, CandleSeries, Timeframe};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create hourly candles from (open, high, low, close) tuples.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| {
            let t_open = base + Duration::hours(i as i64);
            Candle {
                t_open,
                t_close: t_open + Timeframe::H1.as_chrono(),
                open: o,
                high: h,
                low: l,
                close: c,
                volume: 100.0,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Flat 100.0 candles carrying the given volumes.
pub fn with_volumes(volumes: &[f64]) -> CandleSeries {
    let flat: Vec<(f64, f64, f64, f64)> = vec![(100.0, 101.0, 99.0, 100.0); volumes.len()];
    let mut out = CandleSeries::default();
    for (mut c, &v) in make_candles(&flat).into_iter().zip(volumes) {
        c.volume = v;
        out.push(c);
    }
    out
}

/// Test config: dummy credentials, UTC clock.
pub fn default_test_config() -> Config {
    Config {
        telegram_token: "test-token".to_string(),
        allowed_chat_ids: vec![1001],
        exchange_base_url: "http://127.0.0.1:9".to_string(),
        symbols: default_symbol_map(),
        btc_symbol: "BTCUSDT".to_string(),
        default_symbols: vec!["SOLUSDT".to_string(), "ADAUSDT".to_string()],
        timezone: chrono_tz::UTC,
        pulse_minute: 1,
        realtime_tf: Timeframe::M15,
        realtime_interval: 900,
        sessions: default_sessions(),
        strategy: StrategyConfig::default(),
        state_file: std::env::temp_dir()
            .join("sweep_bot_test_state.json")
            .to_string_lossy()
            .to_string(),
        log_level: "error".to_string(),
    }
}
