pub mod bybit;
pub mod replay;

pub use bybit::BybitClient;
pub use replay::ReplayFeed;

use async_trait::async_trait;

use crate::core::levels::PrevDayLevels;
use crate::error::{BotError, Result};
use crate::models::{Candle, CandleSeries, Timeframe};

/// Source of OHLCV bars. Results are ascending by open time and the last
/// element is the bar still in progress.
#[async_trait]
pub trait CandleFeed: Send + Sync {
    async fn fetch_ohlcv(
        &self,
        instrument: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries>;
}

/// Most recent closed bar.
pub async fn last_closed(feed: &dyn CandleFeed, instrument: &str, tf: Timeframe) -> Result<Candle> {
    let series = feed.fetch_ohlcv(instrument, tf, 2).await?;
    series
        .last_closed()
        .cloned()
        .ok_or(BotError::InsufficientData {
            needed: 2,
            got: series.len(),
        })
}

/// The `n` most recent closed bars, oldest first. May return fewer when the
/// exchange has less history.
pub async fn last_closed_n(
    feed: &dyn CandleFeed,
    instrument: &str,
    tf: Timeframe,
    n: usize,
) -> Result<CandleSeries> {
    let series = feed.fetch_ohlcv(instrument, tf, n.max(2) + 1).await?;
    if series.len() < 2 {
        return Err(BotError::InsufficientData {
            needed: 2,
            got: series.len(),
        });
    }
    Ok(series.without_open_bar().tail(n))
}

/// Levels of yesterday's daily bar.
pub async fn prev_day(feed: &dyn CandleFeed, instrument: &str) -> Result<PrevDayLevels> {
    let daily = feed.fetch_ohlcv(instrument, Timeframe::D1, 3).await?;
    PrevDayLevels::from_daily(&daily).ok_or(BotError::InsufficientData {
        needed: 2,
        got: daily.len(),
    })
}
