use std::fmt;

use crate::models::{BtcTrend, Candle, CandleSeries, Direction, RelativeVolume, VolumeTag};

/// Relative volume at or below this is tagged weak.
const WEAK_VOLUME_RATIO: f64 = 0.5;

/// Net BTC body movement over the trailing window.
pub fn btc_headwind(btc: &CandleSeries) -> BtcTrend {
    let delta: f64 = btc.iter().map(|c| c.close - c.open).sum();
    if delta > 0.0 {
        BtcTrend::Up
    } else if delta < 0.0 {
        BtcTrend::Down
    } else {
        BtcTrend::Flat
    }
}

/// Volume of `evaluated` relative to the mean of `trailing`, where the last
/// bar of `trailing` occupies the evaluated slot and is left out of the mean.
pub fn volume_anomaly(trailing: &CandleSeries, evaluated: &Candle, spike: f64) -> RelativeVolume {
    let reference = &trailing.as_slice()[..trailing.len().saturating_sub(1)];
    if reference.is_empty() {
        return RelativeVolume::neutral();
    }
    let avg = reference.iter().map(|c| c.volume).sum::<f64>() / reference.len() as f64;
    let ratio = if avg > 0.0 { evaluated.volume / avg } else { 1.0 };

    let tag = if ratio >= spike {
        VolumeTag::Spike
    } else if ratio <= WEAK_VOLUME_RATIO {
        VolumeTag::Weak
    } else {
        VolumeTag::Normal
    };
    RelativeVolume { ratio, tag }
}

/// Advisory label for a signal given the BTC headwind. Never blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskStatus {
    pub btc: BtcTrend,
    pub direction: Direction,
}

impl RiskStatus {
    pub fn new(direction: Direction, btc: BtcTrend) -> Self {
        Self { btc, direction }
    }

    pub fn is_caution(&self) -> bool {
        self.btc.opposes(self.direction)
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.btc {
            BtcTrend::Flat => write!(f, "BTC: neutral → STATUS: OK"),
            _ if self.is_caution() => write!(f, "BTC: against trend → STATUS: CAUTION"),
            _ => write!(f, "BTC: with trend → STATUS: OK"),
        }
    }
}
