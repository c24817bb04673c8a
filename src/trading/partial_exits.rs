use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::models::{Candle, Direction, Signal};

const DEFAULT_PARTS: [u32; 3] = [40, 40, 20];

/// Percent of the position closed at TP1/TP2/TP3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialScheme {
    pub parts: [u32; 3],
}

impl Default for PartialScheme {
    fn default() -> Self {
        Self {
            parts: DEFAULT_PARTS,
        }
    }
}

impl PartialScheme {
    /// Parse `"40/40/20"`. Unparseable parts are skipped; an empty result
    /// falls back to the default. Parts summing above 100 are rescaled to
    /// exactly 100 (largest remainder). Missing TP parts close 0%.
    pub fn parse(s: &str) -> Self {
        let parts: Vec<u32> = s
            .split('/')
            .filter_map(|p| p.trim().parse::<u32>().ok())
            .collect();
        if parts.is_empty() {
            return Self::default();
        }

        let total: u32 = parts.iter().sum();
        let parts = if total > 100 { rescale(&parts, total) } else { parts };

        let mut out = [0u32; 3];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = part;
        }
        Self { parts: out }
    }

    pub fn part(&self, index: usize) -> u32 {
        self.parts.get(index).copied().unwrap_or(0)
    }
}

impl fmt::Display for PartialScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.parts[0], self.parts[1], self.parts[2])
    }
}

fn rescale(parts: &[u32], total: u32) -> Vec<u32> {
    let exact: Vec<f64> = parts
        .iter()
        .map(|&p| 100.0 * p as f64 / total as f64)
        .collect();
    let mut scaled: Vec<u32> = exact.iter().map(|x| x.floor() as u32).collect();
    let short = 100u32.saturating_sub(scaled.iter().sum());

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(Ordering::Equal).then(a.cmp(&b))
    });
    for &i in order.iter().take(short as usize) {
        scaled[i] += 1;
    }
    scaled
}

/// One take-profit level reached for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialExitEvent {
    pub symbol: String,
    pub direction: Direction,
    /// 0-based: 0 = TP1
    pub level: usize,
    pub price: f64,
    pub close_pct: u32,
    /// New stop (entry) when TP1 moves the stop to breakeven.
    pub breakeven: Option<f64>,
    pub completes_trade: bool,
}

impl fmt::Display for PartialExitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] TP{} hit ({:.6}) → close {}%",
            self.symbol,
            self.direction.label(),
            self.level + 1,
            self.price,
            self.close_pct
        )?;
        if let Some(be) = self.breakeven {
            write!(f, " | move SL → {be:.6} (BE)")
        } else if self.completes_trade {
            write!(f, " | trade complete ✅")
        } else {
            write!(f, " | keep tail")
        }
    }
}

pub struct PartialExitTracker {
    scheme: PartialScheme,
}

impl PartialExitTracker {
    pub fn new(scheme: PartialScheme) -> Self {
        Self { scheme }
    }

    /// Marks newly reached take-profits on `signal` and returns one event per
    /// level. Levels already hit never fire again.
    pub fn update(&self, signal: &mut Signal, candle: &Candle) -> Vec<PartialExitEvent> {
        let mut events = Vec::new();

        for (index, &level) in signal.take_profits.iter().enumerate() {
            if signal.partial_progress.hit(index) {
                continue;
            }
            let reached = match signal.direction {
                Direction::Long => candle.high >= level,
                Direction::Short => candle.low <= level,
            };
            if !reached {
                continue;
            }

            let first_breakeven = index == 0 && !signal.partial_progress.breakeven_moved;
            signal.partial_progress.mark_hit(index);
            events.push(PartialExitEvent {
                symbol: signal.symbol.clone(),
                direction: signal.direction,
                level: index,
                price: level,
                close_pct: self.scheme.part(index),
                breakeven: first_breakeven.then_some(signal.entry),
                completes_trade: index == 2,
            });
        }

        events
    }
}
