// Risk management module
pub mod stops;

pub use stops::{Cooldown, ExitLevels, RiskLimits};
