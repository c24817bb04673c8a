use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BotError, Result};
use crate::models::Timeframe;
use crate::trading::partial_exits::PartialScheme;

/// Fixed intraday window as local (hour, minute) offsets from midnight.
/// `end` may exceed 24h for windows that cross midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTime {
    pub name: String,
    pub start: (u32, u32),
    pub end: (u32, u32),
}

/// Parameters of the regime classifier, signal generator and risk filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Minimum relative volume for a sweep to count.
    pub rvol_sweep_min: f64,
    /// Tolerance when comparing price against PDH/PDL.
    pub eps_level: f64,
    pub atr_period: usize,
    pub ema_trend_period: usize,
    /// Number of closed hourly bars fed into the trend EMA.
    pub trend_window: usize,
    /// Closed hourly bars fetched per symbol each tick.
    pub history_window: usize,
    pub swing_lookback: usize,
    /// Stop buffer in ATR multiples.
    pub buffer_atr_k: f64,
    /// R-multiples for TP1/TP2/TP3.
    pub rr_tp: [f64; 3],
    pub partial_scheme: PartialScheme,
    pub anti_chase_pct: f64,
    pub fvg_required: bool,
    pub sweep_block: bool,
    pub risk_filters: bool,
    pub btc_window: usize,
    pub vol_window: usize,
    pub vol_anomaly: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rvol_sweep_min: 1.2,
            eps_level: 0.0005,
            atr_period: 14,
            ema_trend_period: 20,
            trend_window: 30,
            history_window: 60,
            swing_lookback: 5,
            buffer_atr_k: 0.5,
            rr_tp: [1.0, 2.0, 3.0],
            partial_scheme: PartialScheme::default(),
            anti_chase_pct: 0.005,
            fvg_required: false,
            sweep_block: false,
            risk_filters: true,
            btc_window: 5,
            vol_window: 20,
            vol_anomaly: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub allowed_chat_ids: Vec<i64>,

    // Exchange
    pub exchange_base_url: String,
    /// Supported symbol -> exchange instrument id
    pub symbols: BTreeMap<String, String>,
    pub btc_symbol: String,
    pub default_symbols: Vec<String>,

    // Scheduling
    pub timezone: Tz,
    pub pulse_minute: u32,
    pub realtime_tf: Timeframe,
    pub realtime_interval: u64,

    pub sessions: Vec<SessionTime>,
    pub strategy: StrategyConfig,

    pub state_file: String,
    pub log_level: String,
}

impl Config {
    /// Load from the environment (and `.env`). Missing credentials are the
    /// only hard failure.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let telegram_token = required_env("TELEGRAM_TOKEN")?;
        let allowed_chat_ids = parse_chat_ids(&required_env("ALLOWED_CHAT_IDS")?)?;

        let timezone: Tz = env("BOT_TZ", "Asia/Almaty")
            .parse()
            .map_err(|e| BotError::Config(format!("BOT_TZ: {e}")))?;

        let realtime_tf = Timeframe::from_str_loose(&env("REALTIME_TF", "15m"))
            .ok_or_else(|| BotError::Config("REALTIME_TF must be 5m or 15m".to_string()))?;

        let partial_scheme = PartialScheme::parse(&env("PARTIAL_SCHEME", "40/40/20"));
        let rr_tp = parse_rr_ladder(&env("RR_TP", "1,2,3"))?;

        let defaults = StrategyConfig::default();
        let strategy = StrategyConfig {
            rvol_sweep_min: env("RVOL_SWEEP_MIN", "1.2").parse().unwrap_or(defaults.rvol_sweep_min),
            eps_level: env("EPS_LEVEL", "0.0005").parse().unwrap_or(defaults.eps_level),
            atr_period: env("ATR_PERIOD", "14").parse().unwrap_or(defaults.atr_period),
            ema_trend_period: env("EMA_TREND_PERIOD", "20")
                .parse()
                .unwrap_or(defaults.ema_trend_period),
            buffer_atr_k: env("BUFFER_ATR_K", "0.5").parse().unwrap_or(defaults.buffer_atr_k),
            rr_tp,
            partial_scheme,
            anti_chase_pct: env("ANTI_CHASE_PCT", "0.005")
                .parse()
                .unwrap_or(defaults.anti_chase_pct),
            fvg_required: parse_flag(&env("FVG_REQUIRED", "false")),
            sweep_block: parse_flag(&env("SWEEP_BLOCK", "false")),
            risk_filters: parse_flag(&env("RISK_FILTERS", "true")),
            btc_window: env("BTC_WINDOW", "5").parse().unwrap_or(defaults.btc_window),
            vol_window: env("VOL_WINDOW", "20").parse().unwrap_or(defaults.vol_window),
            vol_anomaly: env("VOL_ANOMALY", "1.5").parse().unwrap_or(defaults.vol_anomaly),
            ..defaults
        };

        let symbols = default_symbol_map();
        let default_symbols: Vec<String> = env("MONITORED_SYMBOLS", "SOLUSDT,ADAUSDT")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| symbols.contains_key(s))
            .collect();

        Ok(Config {
            telegram_token,
            allowed_chat_ids,
            exchange_base_url: env("BYBIT_BASE_URL", "https://api.bybit.com"),
            symbols,
            btc_symbol: "BTCUSDT".to_string(),
            default_symbols,
            timezone,
            pulse_minute: env("PULSE_MINUTE", "1").parse::<u32>().unwrap_or(1).min(59),
            realtime_tf,
            realtime_interval: env("REALTIME_INTERVAL", "900").parse().unwrap_or(900),
            sessions: default_sessions(),
            strategy,
            state_file: env("STATE_FILE", "state.json"),
            log_level: env("LOG_LEVEL", "info"),
        })
    }

    /// Exchange instrument id for a supported symbol.
    pub fn instrument(&self, symbol: &str) -> Result<&str> {
        self.symbols
            .get(symbol)
            .map(String::as_str)
            .ok_or_else(|| BotError::UnknownSymbol(symbol.to_string()))
    }

    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.contains(&chat_id)
    }
}

/// Bybit linear perpetuals the bot knows how to fetch.
pub fn default_symbol_map() -> BTreeMap<String, String> {
    ["SOLUSDT", "ADAUSDT", "BTCUSDT", "LINKUSDT", "DOTUSDT", "XRPUSDT"]
        .into_iter()
        .map(|s| (s.to_string(), s.to_string()))
        .collect()
}

/// Asia 06-15, Europe 15-19, US 19-02 (local time).
pub fn default_sessions() -> Vec<SessionTime> {
    vec![
        SessionTime {
            name: "Asia".to_string(),
            start: (6, 0),
            end: (15, 0),
        },
        SessionTime {
            name: "Europe".to_string(),
            start: (15, 0),
            end: (19, 0),
        },
        SessionTime {
            name: "US".to_string(),
            start: (19, 0),
            end: (26, 0),
        },
    ]
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BotError::Config(format!(
            "required environment variable '{key}' is not set"
        ))),
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_chat_ids(s: &str) -> Result<Vec<i64>> {
    s.split(|c| c == ',' || c == ';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<i64>()
                .map_err(|_| BotError::Config(format!("ALLOWED_CHAT_IDS contains non-numeric id '{p}'")))
        })
        .collect()
}

fn parse_rr_ladder(s: &str) -> Result<[f64; 3]> {
    let parts: Vec<f64> = s
        .replace(';', ",")
        .split(',')
        .filter_map(|p| p.trim().parse::<f64>().ok())
        .collect();
    match parts.as_slice() {
        &[a, b, c] if 0.0 < a && a < b && b < c => Ok([a, b, c]),
        _ => Err(BotError::Config(format!(
            "RR_TP must be three increasing positive numbers, got '{s}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ids_accept_commas_and_semicolons() {
        assert_eq!(parse_chat_ids("1, 2;3").unwrap(), vec![1, 2, 3]);
        assert!(parse_chat_ids("1,abc").is_err());
    }

    #[test]
    fn rr_ladder_must_increase() {
        assert_eq!(parse_rr_ladder("1,2,3").unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(parse_rr_ladder("0.5;1.5;2.5").unwrap(), [0.5, 1.5, 2.5]);
        assert!(parse_rr_ladder("1,1,2").is_err());
        assert!(parse_rr_ladder("1,2").is_err());
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let cfg = crate::test_helpers::default_test_config();
        assert_eq!(cfg.instrument("SOLUSDT").unwrap(), "SOLUSDT");
        assert!(matches!(
            cfg.instrument("DOGEUSDT"),
            Err(BotError::UnknownSymbol(s)) if s == "DOGEUSDT"
        ));
    }

    #[test]
    fn flags_parse_loosely() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }
}
