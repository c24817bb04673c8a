pub mod confirmation;
pub mod partial_exits;
pub mod signal_book;

pub use confirmation::{check_confirmation, Confirmation};
pub use partial_exits::{PartialExitEvent, PartialExitTracker, PartialScheme};
pub use signal_book::{book_key, SignalBook};
