use crate::models::Candle;

/// Exponential moving average seeded with the first sample (no warm-up
/// window). Returns `None` on empty input.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let k = 2.0 / (period as f64 + 1.0);
    Some(rest.iter().fold(first, |seed, &v| (v - seed) * k + seed))
}

/// Simple mean of the true ranges of the last `period` candles (not Wilder
/// smoothed). Needs `period + 1` candles so every bar has a previous close.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let window = &candles[candles.len() - period - 1..];
    let total: f64 = window
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .sum();
    Some(total / period as f64)
}
