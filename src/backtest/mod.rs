pub mod alignment;
pub mod metrics;
pub mod runner;
pub mod simulator;
pub mod synthetic;
pub mod trajectory;

pub use alignment::{AlignedMarket, SymbolFrame};
pub use metrics::{BacktestMetrics, TradeRecord};
pub use runner::{BacktestReport, Backtester};
pub use simulator::{OpenPosition, Position, SimulationConfig, SimulationResult, Simulator};
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
pub use trajectory::{TrajectoryAverage, TRAJECTORY_BUCKETS};
