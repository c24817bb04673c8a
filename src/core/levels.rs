use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Candle, CandleSeries};

/// Open/high/low/close of the most recently closed daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevDayLevels {
    pub day_open: DateTime<Utc>,
    pub pdo: f64,
    pub pdh: f64,
    pub pdl: f64,
    pub pdc: f64,
}

impl PrevDayLevels {
    pub fn from_candle(c: &Candle) -> Self {
        Self {
            day_open: c.t_open,
            pdo: c.open,
            pdh: c.high,
            pdl: c.low,
            pdc: c.close,
        }
    }

    /// Start of the trading day these levels apply to.
    pub fn cycle_start(&self) -> DateTime<Utc> {
        self.day_open + Duration::days(1)
    }

    /// From a raw daily fetch whose last entry is today's open bar.
    pub fn from_daily(daily: &CandleSeries) -> Option<Self> {
        daily.last_closed().map(Self::from_candle)
    }
}
