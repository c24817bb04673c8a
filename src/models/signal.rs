use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Candle, Direction, Regime, Timeframe, VolumeTag};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeVolume {
    pub ratio: f64,
    pub tag: VolumeTag,
}

impl RelativeVolume {
    /// Used when the volume window cannot be fetched.
    pub fn neutral() -> Self {
        Self {
            ratio: 1.0,
            tag: VolumeTag::Normal,
        }
    }
}

/// Write-once take-profit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialProgress {
    pub tp1_hit: bool,
    pub tp2_hit: bool,
    pub tp3_hit: bool,
    pub breakeven_moved: bool,
}

impl PartialProgress {
    pub fn hit(&self, index: usize) -> bool {
        match index {
            0 => self.tp1_hit,
            1 => self.tp2_hit,
            2 => self.tp3_hit,
            _ => false,
        }
    }

    pub(crate) fn mark_hit(&mut self, index: usize) {
        match index {
            0 => {
                self.tp1_hit = true;
                self.breakeven_moved = true;
            }
            1 => self.tp2_hit = true,
            2 => self.tp3_hit = true,
            _ => {}
        }
    }
}

/// A candidate trade derived from one regime classification.
///
/// For `Long`: `stop_loss < entry < take_profits[0] < take_profits[1] < take_profits[2]`,
/// mirrored for `Short`. `take_profits[0]` is always the level nearest to entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profits: [f64; 3],
    pub confirm_threshold: f64,
    pub regime: Regime,
    pub atr: f64,
    pub relative_volume: RelativeVolume,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub partial_progress: PartialProgress,
    /// Confirmation already reported by the hourly pulse.
    #[serde(default)]
    pub confirmed: bool,
    /// Confirmation already reported by the realtime monitor.
    #[serde(default)]
    pub early_confirmed: bool,
    /// Open time of the generating candle; identifies the entry cycle.
    pub opened_at: DateTime<Utc>,
    /// Open time of the last bar run through the stop and take-profit checks.
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Signal {
    /// Stop in force: entry once TP1 has moved it to breakeven.
    pub fn effective_stop(&self) -> f64 {
        if self.partial_progress.breakeven_moved {
            self.entry
        } else {
            self.stop_loss
        }
    }

    pub fn stopped_by(&self, candle: &Candle) -> bool {
        let stop = self.effective_stop();
        match self.direction {
            Direction::Long => candle.low <= stop,
            Direction::Short => candle.high >= stop,
        }
    }

    /// True for bars after the generating bar that have not been checked yet.
    pub fn is_unseen(&self, candle: &Candle) -> bool {
        candle.t_open > self.last_checked.unwrap_or(self.opened_at)
    }

    pub fn is_complete(&self) -> bool {
        self.partial_progress.tp3_hit
    }

    /// Checks the level ordering invariant for this signal's direction.
    pub fn is_well_ordered(&self) -> bool {
        let [tp1, tp2, tp3] = self.take_profits;
        match self.direction {
            Direction::Long => {
                self.stop_loss < self.entry && self.entry < tp1 && tp1 < tp2 && tp2 < tp3
            }
            Direction::Short => {
                self.stop_loss > self.entry && self.entry > tp1 && tp1 > tp2 && tp2 > tp3
            }
        }
    }
}
