// Core modules
pub mod backtest;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::Settings;
pub use error::Error;
pub use models::*;
pub use strategy::SignalClassifier;

// Error handling
pub type Result<T> = std::result::Result<T, Error>;
