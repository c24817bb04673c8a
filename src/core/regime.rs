use crate::config::StrategyConfig;
use crate::core::indicators::ema;
use crate::core::levels::PrevDayLevels;
use crate::models::{Candle, CandleSeries, Regime};

/// Classifies the latest closed bar against the prior day's range.
pub struct RegimeClassifier {
    eps_level: f64,
    rvol_sweep_min: f64,
    ema_period: usize,
    trend_window: usize,
}

impl RegimeClassifier {
    pub fn new(cfg: &StrategyConfig) -> Self {
        Self {
            eps_level: cfg.eps_level,
            rvol_sweep_min: cfg.rvol_sweep_min,
            ema_period: cfg.ema_trend_period,
            trend_window: cfg.trend_window,
        }
    }

    /// Sweep of PDL / PDH on sufficient volume first, otherwise trend vs EMA.
    /// `trend_ema` is `None` when the trend could not be computed.
    pub fn classify(
        &self,
        candle: &Candle,
        levels: &PrevDayLevels,
        relative_volume: f64,
        trend_ema: Option<f64>,
    ) -> Regime {
        let volume_ok = relative_volume >= self.rvol_sweep_min;

        if candle.low < levels.pdl - self.eps_level && candle.close > levels.pdl && volume_ok {
            return Regime::SweepLong;
        }
        if candle.high > levels.pdh + self.eps_level && candle.close < levels.pdh && volume_ok {
            return Regime::SweepShort;
        }

        match trend_ema {
            Some(e) if candle.close >= e => Regime::Up,
            Some(_) => Regime::Down,
            None => Regime::Flat,
        }
    }

    /// EMA of the trailing closed hourly closes.
    pub fn trend_ema(&self, hourly: &CandleSeries) -> Option<f64> {
        ema(&hourly.tail(self.trend_window).closes(), self.ema_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, make_candles};

    fn levels(pdl: f64, pdh: f64) -> PrevDayLevels {
        let c = &make_candles(&[(pdl, pdh, pdl, pdh)])[0];
        PrevDayLevels::from_candle(c)
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        make_candles(&[(open, high, low, close)])[0].clone()
    }

    fn classifier() -> RegimeClassifier {
        RegimeClassifier::new(&default_test_config().strategy)
    }

    #[test]
    fn sweep_long_on_pdl_reclaim_with_volume() {
        let c = bar(100.1, 100.4, 99.9, 100.2);
        let regime = classifier().classify(&c, &levels(100.0, 110.0), 1.3, Some(105.0));
        assert_eq!(regime, Regime::SweepLong);
    }

    #[test]
    fn sweep_needs_relative_volume() {
        let c = bar(100.1, 100.4, 99.9, 100.2);
        // Falls through to trend: close below EMA
        let regime = classifier().classify(&c, &levels(100.0, 110.0), 1.1, Some(105.0));
        assert_eq!(regime, Regime::Down);
    }

    #[test]
    fn sweep_short_on_pdh_rejection() {
        let c = bar(109.5, 110.5, 109.0, 109.8);
        let regime = classifier().classify(&c, &levels(100.0, 110.0), 2.0, Some(100.0));
        assert_eq!(regime, Regime::SweepShort);
    }

    #[test]
    fn wick_within_epsilon_is_not_a_sweep() {
        let c = bar(100.1, 100.4, 99.9998, 100.2);
        let regime = classifier().classify(&c, &levels(100.0, 110.0), 5.0, Some(100.0));
        assert_eq!(regime, Regime::Up);
    }

    #[test]
    fn sweep_long_takes_precedence_over_short() {
        // Outside bar that sweeps both sides and closes inside the range
        let c = bar(105.0, 111.0, 99.0, 105.0);
        let regime = classifier().classify(&c, &levels(100.0, 110.0), 2.0, None);
        assert_eq!(regime, Regime::SweepLong);
    }

    #[test]
    fn trend_uses_close_vs_ema_and_flat_without_ema() {
        let c = bar(104.0, 106.0, 103.0, 105.0);
        let lv = levels(100.0, 110.0);
        assert_eq!(classifier().classify(&c, &lv, 1.0, Some(105.0)), Regime::Up);
        assert_eq!(classifier().classify(&c, &lv, 1.0, Some(105.1)), Regime::Down);
        assert_eq!(classifier().classify(&c, &lv, 1.0, None), Regime::Flat);
    }

    #[test]
    fn trend_ema_uses_trailing_window() {
        let rc = classifier();
        assert!(rc.trend_ema(&CandleSeries::default()).is_none());
        let flat = make_candles(&vec![(50.0, 51.0, 49.0, 50.0); 40]);
        assert!((rc.trend_ema(&flat).unwrap() - 50.0).abs() < 1e-9);
    }
}
