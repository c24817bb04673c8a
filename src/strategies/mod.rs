pub mod signal_generator;

pub use signal_generator::{Rejection, SignalGenerator, SignalInputs};
