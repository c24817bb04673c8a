use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::Result;
use crate::models::{Candle, Regime, Signal, Timeframe};
use crate::storage::{load_or, save_as, KeyValueStore};

const SIGNALS_KEY: &str = "signals";

/// Active signals by `SYMBOL:timeframe`, persisted between ticks so
/// take-profit and confirmation flags are reported at most once per
/// entry cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalBook {
    signals: BTreeMap<String, Signal>,
}

pub fn book_key(symbol: &str, timeframe: Timeframe) -> String {
    format!("{symbol}:{timeframe}")
}

impl SignalBook {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        load_or(store, SIGNALS_KEY, Self::default())
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        save_as(store, SIGNALS_KEY, self)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Signal> {
        self.signals.get(key)
    }

    /// Decide which signal is active for `key` after this tick's regime.
    ///
    /// - `FLAT` leaves the book untouched.
    /// - An active signal in the regime's direction is kept, and its
    ///   progress flags survive, unless it was opened before `cycle_start`
    ///   (the start of the day the current prior-day levels belong to) and a
    ///   fresh candidate exists.
    /// - An active signal in the other direction is expired and replaced
    ///   by `candidate` (if any).
    pub fn reconcile(
        &mut self,
        key: &str,
        regime: Regime,
        candidate: Option<Signal>,
        cycle_start: DateTime<Utc>,
    ) -> Option<&mut Signal> {
        let Some(direction) = regime.direction() else {
            return self.signals.get_mut(key);
        };

        let has_candidate = candidate.is_some();
        let keep = self.signals.get(key).is_some_and(|active| {
            active.direction == direction
                && !active.is_complete()
                && !(has_candidate && active.opened_at < cycle_start)
        });

        if !keep {
            if let Some(expired) = self.signals.remove(key) {
                info!(
                    "Signal {} expired ({} opened {} → {})",
                    key,
                    expired.direction,
                    expired.opened_at.format("%Y-%m-%d %H:%M"),
                    regime
                );
            }
            if let Some(signal) = candidate {
                info!(
                    "Signal {} opened: {} entry={:.6}",
                    key, signal.direction, signal.entry
                );
                self.signals.insert(key.to_string(), signal);
            }
        }

        self.signals.get_mut(key)
    }

    /// Removes and returns the signal at `key` when `candle` is a bar it has
    /// not seen yet and trades through its effective stop.
    pub fn stop_out(&mut self, key: &str, candle: &Candle) -> Option<Signal> {
        let hit = self
            .signals
            .get(key)
            .is_some_and(|s| s.is_unseen(candle) && s.stopped_by(candle));
        if !hit {
            return None;
        }
        let signal = self.signals.remove(key)?;
        info!(
            "Signal {} stopped out at {:.6} ({} {}-{})",
            key,
            signal.effective_stop(),
            candle.t_open.format("%H:%M"),
            candle.low,
            candle.high
        );
        Some(signal)
    }

    /// Drops signals whose final take-profit has been reported.
    pub fn remove_completed(&mut self) -> Vec<String> {
        let done: Vec<String> = self
            .signals
            .iter()
            .filter(|(_, s)| s.is_complete())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &done {
            self.signals.remove(key);
        }
        done
    }
}
