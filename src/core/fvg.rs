use serde::{Deserialize, Serialize};

use crate::models::{CandleSeries, Direction};

/// Price imbalance left by a three-bar displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FvgZone {
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
}

impl FvgZone {
    pub fn contains(&self, price: f64) -> bool {
        self.bottom <= price && price <= self.top
    }
}

/// Gap formed by the last three closed bars in `direction`, if any.
///
/// Bullish: first bar's high below third bar's low. Bearish: first bar's low
/// above third bar's high.
pub fn detect_last_three(candles: &CandleSeries, direction: Direction) -> Option<FvgZone> {
    if candles.len() < 3 {
        return None;
    }
    let last3 = candles.tail(3);
    let c1 = &last3[0];
    let c3 = &last3[2];

    match direction {
        Direction::Long if c3.low > c1.high => Some(FvgZone {
            direction,
            top: c3.low,
            bottom: c1.high,
        }),
        Direction::Short if c1.low > c3.high => Some(FvgZone {
            direction,
            top: c1.low,
            bottom: c3.high,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn detect_bullish_fvg() {
        let candles = make_candles(&[
            (90.0, 95.0, 89.0, 94.0), // ignored, outside the last three
            (100.0, 102.0, 98.0, 101.0),
            (103.0, 106.0, 102.5, 105.0),
            (107.0, 110.0, 106.0, 109.0), // low 106 > first high 102
        ]);
        let zone = detect_last_three(&candles, Direction::Long).unwrap();
        assert!((zone.bottom - 102.0).abs() < 1e-9);
        assert!((zone.top - 106.0).abs() < 1e-9);
        assert!(zone.contains(104.0));
        assert!(!zone.contains(106.5));
        assert!(detect_last_three(&candles, Direction::Short).is_none());
    }

    #[test]
    fn detect_bearish_fvg() {
        let candles = make_candles(&[
            (110.0, 115.0, 108.0, 112.0),
            (106.0, 107.0, 103.0, 104.0),
            (100.0, 102.0, 96.0, 98.0),
        ]);
        let zone = detect_last_three(&candles, Direction::Short).unwrap();
        assert!((zone.top - 108.0).abs() < 1e-9);
        assert!((zone.bottom - 102.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_bars_leave_no_gap() {
        let candles = make_candles(&[
            (100.0, 105.0, 98.0, 104.0),
            (104.0, 106.0, 101.0, 105.0),
            (105.0, 107.0, 104.0, 106.0),
        ]);
        assert!(detect_last_three(&candles, Direction::Long).is_none());
        assert!(detect_last_three(&candles, Direction::Short).is_none());
    }

    #[test]
    fn too_few_candles() {
        let candles = make_candles(&[(1.0, 2.0, 0.5, 1.5), (1.5, 2.5, 1.0, 2.0)]);
        assert!(detect_last_three(&candles, Direction::Long).is_none());
    }
}
