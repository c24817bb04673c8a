use chrono_tz::Tz;

use crate::core::risk_filters::RiskStatus;
use crate::core::sessions::SessionExtremes;
use crate::models::{Candle, Signal, Timeframe};
use crate::trading::Confirmation;

/// Closed hourly bar summary.
pub fn candle_report(symbol: &str, candle: &Candle, tz: Tz, sessions: &[SessionExtremes]) -> String {
    let open_local = candle.t_open.with_timezone(&tz);
    let close_local = candle.t_close.with_timezone(&tz);
    let colour = if candle.is_bullish() { "Green" } else { "Red" };

    let mut out = format!(
        "📊 Closed H1 report:\n\n\
         Asset: {symbol}\n\
         Time: {}-{}\n\
         Candle: H1\n\
         Open: {:.6}\n\
         Close: {:.6}\n\
         Colour: {colour}\n\
         Wick high: {:.6}\n\
         Wick low: {:.6}\n\
         Volume: {:.2}",
        open_local.format("%d.%m.%Y %H:00"),
        close_local.format("%H:00"),
        candle.open,
        candle.close,
        candle.high,
        candle.low,
        candle.volume,
    );

    if !sessions.is_empty() {
        let parts: Vec<String> = sessions
            .iter()
            .map(|s| format!("{} {:.6}/{:.6}", s.name, s.high, s.low))
            .collect();
        out.push_str(&format!("\nSessions (H/L): {}", parts.join(" | ")));
    }
    out
}

/// Confirmation alert. `early_tf` marks a realtime (sub-hourly) alert.
pub fn confirmation_block(
    signal: &Signal,
    confirmation: &Confirmation,
    risk: Option<RiskStatus>,
    early_tf: Option<Timeframe>,
) -> String {
    let tps: Vec<String> = signal.take_profits.iter().map(|t| format!("{t:.6}")).collect();
    let tf_upper = early_tf.map(|tf| tf.as_str().to_uppercase());

    let mut out = match &tf_upper {
        Some(tf) => format!(
            "\n🚨 EARLY {} [{}]: {} (on {tf})\n",
            signal.symbol,
            signal.direction.label(),
            confirmation
        ),
        None => format!(
            "\n⚡️ {} [{}]: {}\n",
            signal.symbol,
            signal.direction.label(),
            confirmation
        ),
    };

    out.push_str(&format!(
        "entry={:.6} SL={:.6} TP={}\n",
        signal.entry,
        signal.stop_loss,
        tps.join(",")
    ));
    if let Some(risk) = risk {
        out.push_str(&format!("{risk}\n"));
    }
    out.push_str(&format!(
        "VOL: {:.2}×avg → {}\n",
        signal.relative_volume.ratio, signal.relative_volume.tag
    ));
    out.push_str(&format!(
        "context: regime={} ATR={:.4}",
        signal.regime, signal.atr
    ));
    if let Some(tf) = &tf_upper {
        out.push_str(&format!(" TF={tf}"));
    }
    out.push('\n');
    out
}

/// Stop-out notice for a signal leaving the book.
pub fn stop_line(signal: &Signal) -> String {
    let head = format!("{} [{}]", signal.symbol, signal.direction.label());
    if signal.partial_progress.breakeven_moved {
        format!(
            "{head} SL hit at breakeven ({:.6}) → close remainder",
            signal.effective_stop()
        )
    } else {
        format!(
            "{head} SL hit ({:.6}) → trade invalidated ❌",
            signal.effective_stop()
        )
    }
}
