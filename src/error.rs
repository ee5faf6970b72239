use thiserror::Error;

/// Errors surfaced by the trading core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient data for {symbol}: need {required} candles, got {available}")]
    InsufficientData {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Model error: {0}")]
    Model(String),

    #[error("No tradable symbols left after alignment")]
    NoTradableSymbols,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
