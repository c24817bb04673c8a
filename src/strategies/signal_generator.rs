use std::fmt;
use tracing::{debug, info};

use crate::config::StrategyConfig;
use crate::core::fvg;
use crate::core::indicators::atr;
use crate::core::levels::PrevDayLevels;
use crate::models::{
    Candle, CandleSeries, Direction, PartialProgress, Regime, RelativeVolume, Signal, Timeframe,
};

/// Everything the generator needs for one symbol on one tick.
pub struct SignalInputs<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    /// The bar that produced the regime.
    pub candle: &'a Candle,
    pub levels: &'a PrevDayLevels,
    /// Closed hourly bars, oldest first.
    pub history: &'a CandleSeries,
    pub regime: Regime,
    pub relative_volume: RelativeVolume,
    /// Sweep direction of the latest hourly regime, checked by `sweep_block`.
    pub hourly_sweep: Option<Direction>,
}

/// Why a candidate was not produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoDirection,
    InsufficientData { needed: usize, got: usize },
    /// Close already beyond the retest zone.
    ChasedEntry { close: f64, entry: f64 },
    OutsideFvg,
    SweepConflict,
    DegenerateRisk,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoDirection => write!(f, "regime has no trade direction"),
            Rejection::InsufficientData { needed, got } => {
                write!(f, "insufficient history ({got}/{needed} candles)")
            }
            Rejection::ChasedEntry { close, entry } => {
                write!(f, "close={close} too far from entry={entry}")
            }
            Rejection::OutsideFvg => write!(f, "entry outside fair value gap"),
            Rejection::SweepConflict => write!(f, "direction opposes hourly sweep"),
            Rejection::DegenerateRisk => write!(f, "zero risk distance"),
        }
    }
}

pub struct SignalGenerator {
    atr_period: usize,
    swing_lookback: usize,
    buffer_atr_k: f64,
    rr_tp: [f64; 3],
    anti_chase_pct: f64,
    fvg_required: bool,
    sweep_block: bool,
}

impl SignalGenerator {
    pub fn new(cfg: &StrategyConfig) -> Self {
        Self {
            atr_period: cfg.atr_period,
            swing_lookback: cfg.swing_lookback,
            buffer_atr_k: cfg.buffer_atr_k,
            rr_tp: cfg.rr_tp,
            anti_chase_pct: cfg.anti_chase_pct,
            fvg_required: cfg.fvg_required,
            sweep_block: cfg.sweep_block,
        }
    }

    /// Candidate trade, or `None` when rejected (reason is logged).
    pub fn generate(&self, input: &SignalInputs<'_>) -> Option<Signal> {
        match self.try_generate(input) {
            Ok(signal) => {
                debug!(
                    "Signal {}: regime={} entry={:.6} sl={:.6} tp={:?} pdl={} pdh={}",
                    input.symbol,
                    input.regime,
                    signal.entry,
                    signal.stop_loss,
                    signal.take_profits,
                    input.levels.pdl,
                    input.levels.pdh
                );
                Some(signal)
            }
            Err(Rejection::NoDirection) => None,
            Err(reason) => {
                info!("Signal {} skipped: {}", input.symbol, reason);
                None
            }
        }
    }

    pub fn try_generate(&self, input: &SignalInputs<'_>) -> Result<Signal, Rejection> {
        let direction = input.regime.direction().ok_or(Rejection::NoDirection)?;

        if self.sweep_block && input.hourly_sweep.is_some_and(|swept| swept != direction) {
            return Err(Rejection::SweepConflict);
        }

        let atr = atr(input.history.as_slice(), self.atr_period).ok_or(
            Rejection::InsufficientData {
                needed: self.atr_period + 1,
                got: input.history.len(),
            },
        )?;
        let swing = input.history.tail(self.swing_lookback);
        if swing.is_empty() {
            return Err(Rejection::InsufficientData {
                needed: self.swing_lookback,
                got: 0,
            });
        }

        let buffer = atr * self.buffer_atr_k;
        let close = input.candle.close;

        let (entry, stop_loss) = match direction {
            Direction::Long => {
                // Retest of PDL, stop behind the recent swing low
                let entry = input.levels.pdl + buffer / 2.0;
                let mut stop = swing.lows_min() - buffer;
                if stop >= entry {
                    stop = entry - buffer;
                }
                if close > entry * (1.0 + self.anti_chase_pct) {
                    return Err(Rejection::ChasedEntry { close, entry });
                }
                (entry, stop)
            }
            Direction::Short => {
                let entry = input.levels.pdh - buffer / 2.0;
                let mut stop = swing.highs_max() + buffer;
                if stop <= entry {
                    stop = entry + buffer;
                }
                if close < entry * (1.0 - self.anti_chase_pct) {
                    return Err(Rejection::ChasedEntry { close, entry });
                }
                (entry, stop)
            }
        };

        let risk = (entry - stop_loss).abs();
        if risk.is_nan() || risk <= 0.0 {
            return Err(Rejection::DegenerateRisk);
        }

        if self.fvg_required {
            let zone = fvg::detect_last_three(input.history, direction);
            if !zone.is_some_and(|z| z.contains(entry)) {
                return Err(Rejection::OutsideFvg);
            }
        }

        let take_profits = self.rr_tp.map(|r| match direction {
            Direction::Long => entry + risk * r,
            Direction::Short => entry - risk * r,
        });

        Ok(Signal {
            symbol: input.symbol.to_string(),
            direction,
            entry,
            stop_loss,
            take_profits,
            confirm_threshold: entry,
            regime: input.regime,
            atr,
            relative_volume: input.relative_volume,
            timeframe: input.timeframe,
            partial_progress: PartialProgress::default(),
            confirmed: false,
            early_confirmed: input.timeframe == Timeframe::H1,
            opened_at: input.candle.t_open,
            last_checked: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, make_candles};

    /// 20 bars of 99-101 around 100: ATR(14) = 2, swing low 99, swing high 101.
    fn history() -> CandleSeries {
        make_candles(&vec![(100.0, 101.0, 99.0, 100.0); 20])
    }

    fn levels(pdl: f64, pdh: f64) -> PrevDayLevels {
        PrevDayLevels::from_candle(&make_candles(&[(pdl, pdh, pdl, pdh)])[0])
    }

    fn bar(close: f64) -> Candle {
        make_candles(&[(close, close + 0.1, close - 0.1, close)])[0].clone()
    }

    fn run(
        generator: &SignalGenerator,
        regime: Regime,
        lv: &PrevDayLevels,
        history: &CandleSeries,
        close: f64,
    ) -> Result<Signal, Rejection> {
        run_on(generator, Timeframe::H1, regime, regime.sweep_direction(), lv, history, close)
    }

    fn run_on(
        generator: &SignalGenerator,
        timeframe: Timeframe,
        regime: Regime,
        hourly_sweep: Option<Direction>,
        lv: &PrevDayLevels,
        history: &CandleSeries,
        close: f64,
    ) -> Result<Signal, Rejection> {
        let candle = bar(close);
        generator.try_generate(&SignalInputs {
            symbol: "SOLUSDT",
            timeframe,
            candle: &candle,
            levels: lv,
            history,
            regime,
            relative_volume: RelativeVolume::neutral(),
            hourly_sweep,
        })
    }

    fn generator() -> SignalGenerator {
        SignalGenerator::new(&default_test_config().strategy)
    }

    #[test]
    fn long_from_uptrend() {
        let sig = run(&generator(), Regime::Up, &levels(98.0, 110.0), &history(), 98.7).unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.atr - 2.0).abs() < 1e-9);
        assert!((sig.entry - 98.5).abs() < 1e-9);
        assert!((sig.stop_loss - 98.0).abs() < 1e-9);
        assert!((sig.take_profits[0] - 99.0).abs() < 1e-9);
        assert!((sig.take_profits[1] - 99.5).abs() < 1e-9);
        assert!((sig.take_profits[2] - 100.0).abs() < 1e-9);
        assert!((sig.confirm_threshold - sig.entry).abs() < 1e-12);
        assert!(sig.is_well_ordered());
    }

    #[test]
    fn long_stop_falls_back_below_entry() {
        // Swing low 99 minus buffer sits above the PDL retest entry
        let sig = run(&generator(), Regime::SweepLong, &levels(90.0, 110.0), &history(), 90.6).unwrap();
        assert!((sig.entry - 90.5).abs() < 1e-9);
        assert!((sig.stop_loss - 89.5).abs() < 1e-9);
        assert!((sig.take_profits[0] - 91.5).abs() < 1e-9);
        assert!((sig.take_profits[2] - 93.5).abs() < 1e-9);
        assert_eq!(sig.regime, Regime::SweepLong);
    }

    #[test]
    fn short_from_downtrend() {
        let sig = run(&generator(), Regime::Down, &levels(90.0, 102.0), &history(), 101.2).unwrap();
        assert_eq!(sig.direction, Direction::Short);
        assert!((sig.entry - 101.5).abs() < 1e-9);
        assert!((sig.stop_loss - 102.0).abs() < 1e-9);
        assert!((sig.take_profits[0] - 101.0).abs() < 1e-9);
        assert!((sig.take_profits[2] - 100.0).abs() < 1e-9);
        assert!(sig.is_well_ordered());
    }

    #[test]
    fn short_stop_falls_back_above_entry() {
        let sig = run(&generator(), Regime::SweepShort, &levels(80.0, 120.0), &history(), 119.0).unwrap();
        assert!((sig.entry - 119.5).abs() < 1e-9);
        assert!((sig.stop_loss - 120.5).abs() < 1e-9);
        assert!(sig.is_well_ordered());
    }

    #[test]
    fn chased_long_is_discarded() {
        // PDL 99.5 with ATR 2 gives entry exactly 100
        let lv = levels(99.5, 110.0);
        let err = run(&generator(), Regime::Up, &lv, &history(), 100.6).unwrap_err();
        assert!(matches!(err, Rejection::ChasedEntry { .. }));
        assert!(run(&generator(), Regime::Up, &lv, &history(), 100.4).is_ok());
    }

    #[test]
    fn chased_short_is_discarded() {
        let lv = levels(80.0, 100.5); // entry 100
        let err = run(&generator(), Regime::Down, &lv, &history(), 99.4).unwrap_err();
        assert!(matches!(err, Rejection::ChasedEntry { .. }));
        assert!(run(&generator(), Regime::Down, &lv, &history(), 99.6).is_ok());
    }

    #[test]
    fn flat_regime_has_no_signal() {
        let err = run(&generator(), Regime::Flat, &levels(98.0, 110.0), &history(), 98.7).unwrap_err();
        assert_eq!(err, Rejection::NoDirection);
    }

    #[test]
    fn short_history_is_insufficient() {
        let short = make_candles(&vec![(100.0, 101.0, 99.0, 100.0); 10]);
        let err = run(&generator(), Regime::Up, &levels(98.0, 110.0), &short, 98.7).unwrap_err();
        assert_eq!(err, Rejection::InsufficientData { needed: 15, got: 10 });
    }

    #[test]
    fn fvg_filter_requires_gap_around_entry() {
        let mut cfg = default_test_config().strategy;
        cfg.fvg_required = true;
        let sg = SignalGenerator::new(&cfg);

        let err = run(&sg, Regime::Up, &levels(98.0, 110.0), &history(), 98.7).unwrap_err();
        assert_eq!(err, Rejection::OutsideFvg);

        // Displacement up: bar 1 high 98.4, bar 3 low 99.0 -> zone [98.4, 99.0]
        let mut data = vec![(100.0, 101.0, 99.0, 100.0); 17];
        data.push((98.0, 98.4, 97.6, 98.3));
        data.push((98.3, 99.6, 98.2, 99.5));
        data.push((99.5, 100.2, 99.0, 100.0));
        let gapped = make_candles(&data);
        let sig = run(&sg, Regime::Up, &levels(98.0, 110.0), &gapped, 98.7).unwrap();
        assert!(sig.entry >= 98.4 && sig.entry <= 99.0);
    }

    #[test]
    fn generated_levels_are_always_ordered() {
        let sg = generator();
        let hist = history();
        for i in 0..40 {
            let pdl = 90.0 + i as f64 * 0.5;
            if let Ok(sig) = run(&sg, Regime::Up, &levels(pdl, pdl + 20.0), &hist, pdl) {
                assert!(sig.is_well_ordered(), "long not ordered at pdl={pdl}: {sig:?}");
            }
            let pdh = 95.0 + i as f64 * 0.5;
            if let Ok(sig) = run(&sg, Regime::Down, &levels(pdh - 20.0, pdh), &hist, pdh) {
                assert!(sig.is_well_ordered(), "short not ordered at pdh={pdh}: {sig:?}");
            }
        }
    }

    #[test]
    fn sweep_block_rejects_trades_against_hourly_sweep() {
        let lv = levels(90.0, 102.0);
        let hist = history();
        // Quarter-hour downtrend right after the hourly bar swept the lows
        let against = |sg: &SignalGenerator| {
            run_on(sg, Timeframe::M15, Regime::Down, Some(Direction::Long), &lv, &hist, 101.2)
        };

        assert!(against(&generator()).is_ok());

        let mut cfg = default_test_config().strategy;
        cfg.sweep_block = true;
        let sg = SignalGenerator::new(&cfg);
        assert_eq!(against(&sg).unwrap_err(), Rejection::SweepConflict);

        let aligned = run_on(&sg, Timeframe::M15, Regime::Down, Some(Direction::Short), &lv, &hist, 101.2);
        assert_eq!(aligned.unwrap().direction, Direction::Short);
        assert!(run_on(&sg, Timeframe::M15, Regime::Down, None, &lv, &hist, 101.2).is_ok());
        assert!(run(&sg, Regime::SweepShort, &lv, &hist, 101.2).is_ok());
    }
}
