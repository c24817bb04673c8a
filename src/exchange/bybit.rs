use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::exchange::CandleFeed;
use crate::models::{Candle, CandleSeries, Timeframe};

const KLINE_PATH: &str = "/v5/market/kline";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: KlineResult,
}

#[derive(Debug, Default, Deserialize)]
struct KlineResult {
    /// `[start_ms, open, high, low, close, volume, turnover]`, newest first.
    #[serde(default)]
    list: Vec<Vec<String>>,
}

/// Public Bybit v5 market data for linear perpetuals.
pub struct BybitClient {
    client: Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
    cache: Mutex<HashMap<String, (Instant, CandleSeries)>>,
    cache_ttl: Duration,
}

impl BybitClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: cfg.exchange_base_url.trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::from_secs(5),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn cached(&self, key: &str) -> Option<CandleSeries> {
        let cache = self.cache.lock().await;
        cache
            .get(key)
            .filter(|(at, _)| at.elapsed() < self.cache_ttl)
            .map(|(_, series)| series.clone())
    }

    async fn request_klines(&self, instrument: &str, tf: Timeframe, limit: usize) -> Result<CandleSeries> {
        self.rate_limit().await;

        let limit = limit.to_string();
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, KLINE_PATH))
            .query(&[
                ("category", "linear"),
                ("symbol", instrument),
                ("interval", tf.bybit_interval()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!("Bybit HTTP {status}: {body}")));
        }

        let data: KlineResponse = resp.json().await?;
        if data.ret_code != 0 {
            return Err(BotError::Exchange {
                code: data.ret_code,
                message: data.ret_msg,
            });
        }

        Ok(parse_klines(data.result.list, tf))
    }
}

/// Rows with unparseable fields are dropped.
fn parse_klines(rows: Vec<Vec<String>>, tf: Timeframe) -> CandleSeries {
    let mut candles: Vec<Candle> = rows
        .into_iter()
        .filter_map(|row| {
            let ms = row.first()?.parse::<i64>().ok()?;
            let t_open = DateTime::from_timestamp_millis(ms)?;
            let field = |i: usize| row.get(i).and_then(|v| v.parse::<f64>().ok());
            Some(Candle {
                t_open,
                t_close: t_open + tf.as_chrono(),
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: field(5)?,
            })
        })
        .collect();

    // Bybit returns newest first, we want oldest first
    candles.sort_by_key(|c| c.t_open);
    CandleSeries::new(candles)
}

#[async_trait]
impl CandleFeed for BybitClient {
    async fn fetch_ohlcv(
        &self,
        instrument: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        let cache_key = format!("{instrument}_{tf}_{limit}");
        if let Some(series) = self.cached(&cache_key).await {
            debug!("Cache hit {}", cache_key);
            return Ok(series);
        }

        let series = self.request_klines(instrument, tf, limit).await?;

        self.cache
            .lock()
            .await
            .insert(cache_key, (Instant::now(), series.clone()));

        Ok(series)
    }
}
