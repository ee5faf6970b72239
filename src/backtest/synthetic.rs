use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{AssetSeries, Candle};

/// First bar of every generated series (2024-01-01T00:00:00Z), shared so that
/// series generated separately align on timestamps
const START_TIMESTAMP: i64 = 1_704_067_200;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with noise (-2% daily average)
    Downtrend,
    /// Sideways/choppy market (±1% around mean)
    Sideways,
    /// High volatility (±5% large swings)
    Volatile,
    /// Contains time gaps (missing candles)
    WithGaps,
}

/// Generates synthetic price data for backtesting
pub struct SyntheticDataGenerator {
    rng: StdRng,
    start: DateTime<Utc>,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start: Utc
                .timestamp_opt(START_TIMESTAMP, 0)
                .single()
                .unwrap_or_default(),
            base_price: 150.0,
            base_volume: 1_000_000.0,
        }
    }

    /// Generate an hourly series for one symbol
    pub fn generate_series(
        &mut self,
        symbol: &str,
        scenario: MarketScenario,
        num_candles: usize,
    ) -> AssetSeries {
        AssetSeries::new(symbol, self.generate(scenario, num_candles, 60))
    }

    /// Generate one hourly series per (symbol, scenario) pair on a shared clock
    pub fn generate_market(
        &mut self,
        assets: &[(&str, MarketScenario)],
        num_candles: usize,
    ) -> Vec<AssetSeries> {
        assets
            .iter()
            .map(|(symbol, scenario)| self.generate_series(symbol, *scenario, num_candles))
            .collect()
    }

    /// Generate candles for a specific market scenario
    ///
    /// # Arguments
    /// * `scenario` - The market scenario to simulate
    /// * `num_candles` - Number of candles to generate
    /// * `interval_minutes` - Minutes between candles
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let periods_per_day = 24.0 * 60.0 / interval_minutes as f64;
        let mut candles = Vec::with_capacity(num_candles);
        let mut price = self.base_price;
        let mut slot = 0i64;

        for i in 0..num_candles {
            price = match scenario {
                MarketScenario::Uptrend => self.trend_step(price, 0.02 / periods_per_day),
                MarketScenario::Downtrend => self.trend_step(price, -0.02 / periods_per_day),
                MarketScenario::Sideways => {
                    // 10% pull to mean plus ±1% noise
                    let reversion = (self.base_price - price) * 0.1;
                    price + reversion + price * self.rng.gen_range(-0.01..0.01)
                }
                MarketScenario::Volatile => {
                    let next = price * (1.0 + self.rng.gen_range(-0.05..0.05));
                    next.max(self.base_price * 0.5)
                }
                MarketScenario::WithGaps => {
                    // Skip two slots every 50th candle
                    if i % 50 == 49 {
                        slot += 2;
                    }
                    price * (1.0 + self.rng.gen_range(-0.01..0.01))
                }
            };

            let timestamp = self.start + Duration::minutes(slot * interval_minutes);
            candles.push(self.create_candle(price, timestamp));
            slot += 1;
        }

        candles
    }

    /// Drift plus ±0.1% noise so the trend dominates
    fn trend_step(&mut self, price: f64, drift: f64) -> f64 {
        price * (1.0 + drift + self.rng.gen_range(-0.001..0.001))
    }

    /// Helper to create a candle from price and timestamp
    fn create_candle(&mut self, price: f64, timestamp: DateTime<Utc>) -> Candle {
        // ±0.2% intrabar movement around the close
        let noise_pct = 0.002;

        let high = price * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = price * (1.0 - self.rng.gen_range(0.0..noise_pct));

        let open_raw = price * (1.0 + self.rng.gen_range(-noise_pct..noise_pct));
        let open = open_raw.clamp(low, high);

        // Vary volume ±30%
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uptrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Uptrend, 500, 60);

        assert_eq!(candles.len(), 500);

        let first_price = candles.first().unwrap().close;
        let last_price = candles.last().unwrap().close;
        assert!(
            last_price > first_price,
            "Uptrend should end higher: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_downtrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Downtrend, 500, 60);

        let first_price = candles.first().unwrap().close;
        let last_price = candles.last().unwrap().close;
        assert!(
            last_price < first_price,
            "Downtrend should end lower: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_sideways() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Sideways, 500, 60);

        let base = gen.base_price;
        for candle in &candles {
            assert!(
                candle.close > base * 0.9 && candle.close < base * 1.1,
                "Sideways should stay near base: {} vs {}",
                candle.close,
                base
            );
        }
    }

    #[test]
    fn test_generated_series_validate() {
        let mut gen = SyntheticDataGenerator::new(42);
        let series = gen.generate_series("SOL", MarketScenario::Volatile, 300);
        assert_eq!(series.symbol, "SOL");
        assert!(series.validate(Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_gaps_fail_validation() {
        let mut gen = SyntheticDataGenerator::new(42);
        let series = gen.generate_series("GAP", MarketScenario::WithGaps, 100);
        assert_eq!(series.len(), 100);
        assert!(series.validate(Duration::hours(1)).is_err());
    }

    #[test]
    fn test_market_shares_timestamps() {
        let mut gen = SyntheticDataGenerator::new(1);
        let market = gen.generate_market(
            &[("A", MarketScenario::Uptrend), ("B", MarketScenario::Sideways)],
            50,
        );
        assert_eq!(market.len(), 2);
        for (a, b) in market[0].candles.iter().zip(&market[1].candles) {
            assert_eq!(a.timestamp, b.timestamp);
        }
    }

    #[test]
    fn test_ohlc_consistency() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Volatile, 100, 60);

        for candle in &candles {
            assert!(candle.high >= candle.close, "High should be >= close");
            assert!(candle.high >= candle.open, "High should be >= open");
            assert!(candle.low <= candle.close, "Low should be <= close");
            assert!(candle.low <= candle.open, "Low should be <= open");
            assert!(candle.close > 0.0);
        }
    }
}
