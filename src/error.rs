use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("Insufficient data: needed {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Exchange API error {code}: {message}")]
    Exchange { code: i64, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        BotError::Transport(e.to_string())
    }
}

pub type Result<T, E = BotError> = std::result::Result<T, E>;
