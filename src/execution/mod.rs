// Order execution and notification collaborators
pub mod notifier;
pub mod paper;

pub use notifier::LogNotifier;
pub use paper::{Fill, PaperExecution};

use crate::models::TradeSide;

/// Order execution boundary, called on every open/close transition
///
/// An error means the order was not filled; the caller must not assume the
/// position changed.
pub trait ExecutionClient {
    fn submit(&mut self, symbol: &str, side: TradeSide, fraction: f64) -> anyhow::Result<()>;
}

/// Receives one human-readable message per open/close event
///
/// Implementations handle their own delivery failures.
pub trait Notifier {
    fn notify(&self, message: &str);
}
