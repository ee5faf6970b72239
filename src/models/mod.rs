use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// OHLCV candlestick data for one asset at one timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Intrabar range, used to rank simultaneous rule-based entries
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Ordered candle history for a single symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSeries {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

impl AssetSeries {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The last `count` candles (or all of them when shorter)
    pub fn tail(&self, count: usize) -> Self {
        let start = self.candles.len().saturating_sub(count);
        Self {
            symbol: self.symbol.clone(),
            candles: self.candles[start..].to_vec(),
        }
    }

    /// Validate that candles are strictly increasing and uniformly spaced in time
    ///
    /// Allows up to 1.5x the expected interval between candles. Open and close
    /// must be strictly positive, everything else finite and non-negative.
    pub fn validate(&self, expected_interval: Duration) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSeries {
            symbol: self.symbol.clone(),
            reason,
        };

        for candle in &self.candles {
            let finite = [candle.open, candle.high, candle.low, candle.close, candle.volume]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0);
            if !finite || candle.open <= 0.0 || candle.close <= 0.0 {
                return Err(invalid(format!(
                    "malformed candle at {}",
                    candle.timestamp
                )));
            }
        }

        // Allow 50% tolerance for slight timing variations
        let max_gap = expected_interval + expected_interval / 2;

        for window in self.candles.windows(2) {
            let time_diff = window[1].timestamp - window[0].timestamp;

            if time_diff <= Duration::zero() {
                return Err(invalid(format!(
                    "timestamps not strictly increasing at {}",
                    window[1].timestamp
                )));
            }

            if time_diff > max_gap {
                return Err(invalid(format!(
                    "data gap of {}s between {} and {} (expected ~{}s)",
                    time_diff.num_seconds(),
                    window[0].timestamp,
                    window[1].timestamp,
                    expected_interval.num_seconds()
                )));
            }
        }

        Ok(())
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Buy, Signal::Sell, Signal::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified bar: the signal plus the measure used to rank competing entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub signal: Signal,
    /// Bar range for rule-based decisions, class probability for learned ones
    pub strength: f64,
}

impl Decision {
    pub fn new(signal: Signal, strength: f64) -> Self {
        Self { signal, strength }
    }

    pub fn neutral() -> Self {
        Self::new(Signal::Neutral, 0.0)
    }
}

/// Order direction passed to the execution collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitReason {
    /// Classifier emitted SELL for the held symbol
    Signal,
    StopLoss,
    TakeProfit,
    /// Pre-empted by a stronger BUY on another symbol
    Switch,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExitReason::Signal => "sell signal",
            ExitReason::StopLoss => "stop loss",
            ExitReason::TakeProfit => "take profit",
            ExitReason::Switch => "switch",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(count: usize) -> Vec<Candle> {
        let start = Utc::now();
        (0..count)
            .map(|i| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_validate_uniform_series() {
        let series = AssetSeries::new("BTC", hourly(10));
        assert!(series.validate(Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_validate_detects_gap() {
        let mut candles = hourly(10);
        candles.remove(5);
        let series = AssetSeries::new("BTC", candles);
        let err = series.validate(Duration::hours(1)).unwrap_err();
        assert!(err.to_string().contains("data gap"));
    }

    #[test]
    fn test_validate_rejects_unsorted() {
        let mut candles = hourly(5);
        candles.swap(1, 2);
        let series = AssetSeries::new("BTC", candles);
        assert!(series.validate(Duration::hours(1)).is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_close() {
        let mut candles = hourly(5);
        candles[3].close = 0.0;
        let series = AssetSeries::new("BTC", candles);
        assert!(series.validate(Duration::hours(1)).is_err());
    }

    #[test]
    fn test_tail() {
        let series = AssetSeries::new("ETH", hourly(10));
        assert_eq!(series.tail(4).len(), 4);
        assert_eq!(series.tail(40).len(), 10);
        assert_eq!(series.tail(4).candles[0].timestamp, series.candles[6].timestamp);
    }
}
