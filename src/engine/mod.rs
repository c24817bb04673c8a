pub mod pulse;
pub mod report;
pub mod schedule;

pub use pulse::SignalEngine;
pub use schedule::compute_next_pulse;
