use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Upper-case tag used in chat output, e.g. `[LONG]`.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

/// Market regime of the latest closed bar. Sweeps take precedence over trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    SweepLong,
    SweepShort,
    Up,
    Down,
    /// Trend could not be computed. Not a trading regime.
    Flat,
}

impl Regime {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Regime::SweepLong | Regime::Up => Some(Direction::Long),
            Regime::SweepShort | Regime::Down => Some(Direction::Short),
            Regime::Flat => None,
        }
    }

    /// Direction implied by a sweep, `None` for trend regimes.
    pub fn sweep_direction(self) -> Option<Direction> {
        match self {
            Regime::SweepLong => Some(Direction::Long),
            Regime::SweepShort => Some(Direction::Short),
            Regime::Up | Regime::Down | Regime::Flat => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::SweepLong => "SWEEP_LONG",
            Regime::SweepShort => "SWEEP_SHORT",
            Regime::Up => "UP",
            Regime::Down => "DOWN",
            Regime::Flat => "FLAT",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTag {
    Spike,
    Weak,
    Normal,
}

impl fmt::Display for VolumeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTag::Spike => write!(f, "spike ⚡"),
            VolumeTag::Weak => write!(f, "weak"),
            VolumeTag::Normal => write!(f, "normal"),
        }
    }
}

/// Net direction of BTC over the trailing headwind window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BtcTrend {
    Up,
    Down,
    Flat,
}

impl BtcTrend {
    /// True when BTC moves against a trade in `direction`.
    pub fn opposes(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (BtcTrend::Down, Direction::Long) | (BtcTrend::Up, Direction::Short)
        )
    }
}

impl fmt::Display for BtcTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BtcTrend::Up => write!(f, "up"),
            BtcTrend::Down => write!(f, "down"),
            BtcTrend::Flat => write!(f, "flat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_maps_to_trade_direction() {
        assert_eq!(Regime::SweepLong.direction(), Some(Direction::Long));
        assert_eq!(Regime::Up.direction(), Some(Direction::Long));
        assert_eq!(Regime::SweepShort.direction(), Some(Direction::Short));
        assert_eq!(Regime::Down.direction(), Some(Direction::Short));
        assert_eq!(Regime::Flat.direction(), None);
        assert_eq!(Regime::Up.sweep_direction(), None);
    }

    #[test]
    fn regime_serializes_as_screaming_tag() {
        let json = serde_json::to_string(&Regime::SweepLong).unwrap();
        assert_eq!(json, "\"SWEEP_LONG\"");
        assert_eq!(Regime::SweepShort.to_string(), "SWEEP_SHORT");
    }

    #[test]
    fn btc_headwind_opposition() {
        assert!(BtcTrend::Down.opposes(Direction::Long));
        assert!(BtcTrend::Up.opposes(Direction::Short));
        assert!(!BtcTrend::Up.opposes(Direction::Long));
        assert!(!BtcTrend::Flat.opposes(Direction::Short));
    }
}
