// Technical indicators module
// Rolling-window indicators, swing detection, trend channels and the feature pipeline

pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod pipeline;
pub mod rsi;
pub mod stochastic;
pub mod swing;
pub mod trend_channel;
pub mod volume;

pub use atr::{calculate_atr, true_ranges};
pub use bollinger::{calculate_bollinger, BollingerBand};
pub use macd::{calculate_macd, Macd};
pub use moving_average::{ema_series, sma_series};
pub use pipeline::{EnrichedSeries, FeaturePipeline, FeatureRow, FEATURE_COLUMNS};
pub use rsi::calculate_rsi;
pub use stochastic::calculate_stochastic;
pub use swing::{detect_confirmed_swings, detect_swings, SwingConfirmation};
pub use trend_channel::{track_trend_channels, trend_touch, Channel, TrendFeatures, TrendLine};
pub use volume::calculate_volume_change;
