use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{BotError, Result};
use crate::exchange::CandleFeed;
use crate::models::{Candle, CandleSeries, Timeframe};

/// A CandleFeed that replays pre-loaded candles.
/// A cursor (`now`) controls which candles are visible: only bars with
/// `t_open <= now` are returned, the last of them playing the in-progress bar.
pub struct ReplayFeed {
    data: RwLock<HashMap<(String, Timeframe), Vec<Candle>>>,
    now: RwLock<DateTime<Utc>>,
}

impl ReplayFeed {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            now: RwLock::new(now),
        }
    }

    /// Candles must be sorted oldest-first.
    pub fn load(&self, instrument: &str, tf: Timeframe, candles: Vec<Candle>) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert((instrument.to_string(), tf), candles);
    }

    pub fn set_time(&self, t: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = t;
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn visible_candles(&self, instrument: &str, tf: Timeframe, limit: usize) -> Option<CandleSeries> {
        let now = self.current_time();
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let all = data.get(&(instrument.to_string(), tf))?;

        let end = all.partition_point(|c| c.t_open <= now);
        let start = end.saturating_sub(limit);
        Some(CandleSeries::new(all[start..end].to_vec()))
    }
}

#[async_trait]
impl CandleFeed for ReplayFeed {
    async fn fetch_ohlcv(
        &self,
        instrument: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        let known = {
            let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
            data.keys().any(|(sym, _)| sym == instrument)
        };
        if !known {
            return Err(BotError::UnknownSymbol(instrument.to_string()));
        }
        Ok(self.visible_candles(instrument, tf, limit).unwrap_or_default())
    }
}
