use std::fmt;

use crate::models::{Direction, Signal};

/// Close crossed the confirmation threshold in the trade's direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub direction: Direction,
    pub close: f64,
    pub threshold: f64,
}

impl Confirmation {
    pub fn label(&self) -> &'static str {
        match self.direction {
            Direction::Long => "Confirm long (C)",
            Direction::Short => "Confirm short (C)",
        }
    }

    pub fn reason(&self) -> String {
        let op = match self.direction {
            Direction::Long => "≥",
            Direction::Short => "≤",
        };
        format!("close {:.4} {} {:.6}", self.close, op, self.threshold)
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}", self.label(), self.reason())
    }
}

/// Stateless; callers track whether a confirmation was already reported.
pub fn check_confirmation(signal: &Signal, close: f64) -> Option<Confirmation> {
    let confirmed = match signal.direction {
        Direction::Long => close >= signal.confirm_threshold,
        Direction::Short => close <= signal.confirm_threshold,
    };
    confirmed.then(|| Confirmation {
        direction: signal.direction,
        close,
        threshold: signal.confirm_threshold,
    })
}
