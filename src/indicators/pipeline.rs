use serde::{Deserialize, Serialize};

use super::{
    calculate_atr, calculate_bollinger, calculate_macd, calculate_rsi, calculate_stochastic,
    calculate_volume_change, detect_confirmed_swings, detect_swings, track_trend_channels,
    SwingConfirmation,
};
use crate::config::{IndicatorSettings, Settings, SwingSettings, TrendSettings};
use crate::models::{AssetSeries, Candle};

/// Feature columns consumed by the learned classifier, in model order
pub const FEATURE_COLUMNS: [&str; 9] = [
    "rsi",
    "macd",
    "macd_signal",
    "macd_hist",
    "stoch_k",
    "stoch_d",
    "bollinger_width",
    "bollinger_position",
    "volume_change",
];

/// One candle plus every derived indicator
///
/// `None` marks an indicator still inside its warm-up window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub candle: Candle,
    pub rsi: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub bollinger_width: Option<f64>,
    pub bollinger_position: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub atr: Option<f64>,
    pub volume_change: f64,
    pub swing: i8,
    pub trend_support_score: u32,
    pub trend_support_line: Option<f64>,
    pub trend_resistance_score: u32,
    pub trend_resistance_line: Option<f64>,
    pub trend_touch: i8,
}

impl FeatureRow {
    /// A row with no indicator defined yet
    pub fn bare(candle: Candle) -> Self {
        Self {
            candle,
            rsi: None,
            stoch_k: None,
            stoch_d: None,
            bollinger_upper: None,
            bollinger_lower: None,
            bollinger_width: None,
            bollinger_position: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            atr: None,
            volume_change: 0.0,
            swing: 0,
            trend_support_score: 0,
            trend_support_line: None,
            trend_resistance_score: 0,
            trend_resistance_line: None,
            trend_touch: 0,
        }
    }

    /// Model input in `FEATURE_COLUMNS` order, `None` if any value is undefined
    pub fn feature_vector(&self) -> Option<[f64; 9]> {
        Some([
            self.rsi?,
            self.macd?,
            self.macd_signal?,
            self.macd_hist?,
            self.stoch_k?,
            self.stoch_d?,
            self.bollinger_width?,
            self.bollinger_position?,
            self.volume_change,
        ])
    }
}

/// Feature rows for one symbol, indexed by position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSeries {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
}

impl EnrichedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Maps raw candles to feature rows
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    indicators: IndicatorSettings,
    swing: SwingSettings,
    trend: TrendSettings,
}

impl FeaturePipeline {
    pub fn new(settings: &Settings) -> Self {
        Self {
            indicators: settings.indicators.clone(),
            swing: settings.swing.clone(),
            trend: settings.trend.clone(),
        }
    }

    /// Bars needed before every indicator is defined
    pub fn warmup_bars(&self) -> usize {
        let ind = &self.indicators;
        [
            ind.rsi_period + 1,
            ind.stoch_k_period + ind.stoch_d_period - 1,
            ind.bollinger_period,
            ind.macd_slow + ind.macd_signal - 1,
            ind.atr_period + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Compute every indicator column; the input series is left untouched
    pub fn enrich(&self, series: &AssetSeries) -> EnrichedSeries {
        let candles = &series.candles;
        let ind = &self.indicators;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let rsi = calculate_rsi(&closes, ind.rsi_period);
        let (stoch_k, stoch_d) =
            calculate_stochastic(candles, ind.stoch_k_period, ind.stoch_d_period);
        let bollinger = calculate_bollinger(&closes, ind.bollinger_period, ind.bollinger_std_dev);
        let (macd_line, macd) =
            calculate_macd(&closes, ind.macd_fast, ind.macd_slow, ind.macd_signal);
        let atr = calculate_atr(candles, ind.atr_period);
        let volume_change = calculate_volume_change(&volumes);

        let swings = if self.swing.strict {
            detect_confirmed_swings(
                candles,
                &atr,
                self.swing.range,
                SwingConfirmation {
                    atr_multiplier: self.swing.atr_multiplier,
                    confirmation_window: self.swing.confirmation_window,
                },
            )
        } else {
            detect_swings(candles, self.swing.range)
        };

        let trend = track_trend_channels(
            &lows,
            &highs,
            &swings,
            self.trend.tolerance_pct,
            self.trend.lookback,
        );

        let rows = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| FeatureRow {
                candle: *candle,
                rsi: rsi[i],
                stoch_k: stoch_k[i],
                stoch_d: stoch_d[i],
                bollinger_upper: bollinger[i].map(|b| b.upper),
                bollinger_lower: bollinger[i].map(|b| b.lower),
                bollinger_width: bollinger[i].map(|b| b.width),
                bollinger_position: bollinger[i].map(|b| b.position),
                macd: macd_line[i],
                macd_signal: macd[i].map(|m| m.signal),
                macd_hist: macd[i].map(|m| m.histogram),
                atr: atr[i],
                volume_change: volume_change[i],
                swing: swings[i],
                trend_support_score: trend.support_score[i],
                trend_support_line: trend.support_line[i],
                trend_resistance_score: trend.resistance_score[i],
                trend_resistance_line: trend.resistance_line[i],
                trend_touch: trend.touch[i],
            })
            .collect();

        tracing::debug!(
            "Enriched {} with {} rows ({} swings)",
            series.symbol,
            candles.len(),
            swings.iter().filter(|&&s| s != 0).count()
        );

        EnrichedSeries {
            symbol: series.symbol.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::synthetic::{MarketScenario, SyntheticDataGenerator};

    #[test]
    fn test_enrich_preserves_length_and_input() {
        let mut gen = SyntheticDataGenerator::new(7);
        let series = gen.generate_series("SOL", MarketScenario::Volatile, 300);
        let before = series.candles.clone();

        let pipeline = FeaturePipeline::new(&Settings::default());
        let enriched = pipeline.enrich(&series);

        assert_eq!(enriched.len(), 300);
        assert_eq!(enriched.symbol, "SOL");
        assert_eq!(series.candles, before);
    }

    #[test]
    fn test_features_defined_after_warmup() {
        let mut gen = SyntheticDataGenerator::new(7);
        let series = gen.generate_series("SOL", MarketScenario::Volatile, 200);

        let pipeline = FeaturePipeline::new(&Settings::default());
        let enriched = pipeline.enrich(&series);

        assert!(enriched.rows[0].feature_vector().is_none());
        assert!(enriched.rows[0].rsi.is_none());
        assert_eq!(enriched.rows[0].volume_change, 0.0);

        let warmup = pipeline.warmup_bars();
        assert_eq!(warmup, 34);
        assert!(enriched.rows[warmup - 1].feature_vector().is_some());
        assert!(enriched.rows[warmup - 1].atr.is_some());
    }

    #[test]
    fn test_swings_and_touches_are_bounded() {
        let mut gen = SyntheticDataGenerator::new(11);
        let series = gen.generate_series("ADA", MarketScenario::Sideways, 400);

        let mut settings = Settings::default();
        settings.trend.lookback = 20;
        let enriched = FeaturePipeline::new(&settings).enrich(&series);

        assert!(enriched.rows.iter().any(|r| r.swing != 0));
        for row in &enriched.rows {
            assert!((-1..=1).contains(&row.swing));
            assert!((-1..=1).contains(&row.trend_touch));
            if row.trend_support_line.is_some() {
                assert_eq!(row.swing, -1);
                assert!(row.trend_support_score >= 1);
            }
        }
    }

    #[test]
    fn test_strict_swings_are_a_subset() {
        let mut gen = SyntheticDataGenerator::new(5);
        let series = gen.generate_series("ETH", MarketScenario::Volatile, 400);

        let mut settings = Settings::default();
        let loose = FeaturePipeline::new(&settings).enrich(&series);
        settings.swing.strict = true;
        let strict = FeaturePipeline::new(&settings).enrich(&series);

        let count = |e: &EnrichedSeries| e.rows.iter().filter(|r| r.swing != 0).count();
        assert!(count(&loose) > 0);
        assert!(count(&strict) <= count(&loose));
        for (s, l) in strict.rows.iter().zip(&loose.rows) {
            if s.swing != 0 {
                assert_ne!(l.swing, 0);
            }
        }
    }
}
