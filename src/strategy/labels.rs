//! Forward-looking training labels
//!
//! A bar is labelled BUY when any high in the next `future_candles` bars
//! clears `close * (1 + future_gain)`, otherwise SELL when any low breaks
//! `close * (1 - future_loss)`, otherwise NEUTRAL.

use crate::config::ClassifierSettings;
use crate::indicators::{EnrichedSeries, FeatureRow};
use crate::models::Signal;

/// Label each row; `None` for rows without a full look-ahead window
pub fn label_rows(rows: &[FeatureRow], settings: &ClassifierSettings) -> Vec<Option<Signal>> {
    let horizon = settings.future_candles;
    (0..rows.len())
        .map(|i| {
            if i + horizon >= rows.len() {
                return None;
            }
            let close = rows[i].candle.close;
            let future = &rows[i + 1..=i + horizon];
            let future_max = future.iter().map(|r| r.candle.high).fold(f64::MIN, f64::max);
            let future_min = future.iter().map(|r| r.candle.low).fold(f64::MAX, f64::min);

            Some(if future_max > close * (1.0 + settings.future_gain) {
                Signal::Buy
            } else if future_min < close * (1.0 - settings.future_loss) {
                Signal::Sell
            } else {
                Signal::Neutral
            })
        })
        .collect()
}

/// Feature matrix and labels assembled across symbols
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<Signal>,
}

impl TrainingSet {
    /// Append every labelled row whose features are all defined
    pub fn extend_from(&mut self, series: &EnrichedSeries, settings: &ClassifierSettings) {
        let labels = label_rows(&series.rows, settings);
        let before = self.len();
        for (row, label) in series.rows.iter().zip(labels) {
            if let (Some(features), Some(label)) = (row.feature_vector(), label) {
                self.features.push(features.to_vec());
                self.labels.push(label);
            }
        }
        tracing::debug!(
            "Collected {} training rows from {}",
            self.len() - before,
            series.symbol
        );
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Row counts in `Signal::ALL` order
    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for label in &self.labels {
            if let Some(i) = Signal::ALL.iter().position(|s| s == label) {
                counts[i] += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::indicators::FeaturePipeline;
    use crate::models::{AssetSeries, Candle};
    use chrono::{Duration, Utc};

    fn series_from_closes(closes: &[f64]) -> EnrichedSeries {
        let start = Utc::now();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        FeaturePipeline::new(&Settings::default()).enrich(&AssetSeries::new("T", candles))
    }

    fn settings(horizon: usize) -> ClassifierSettings {
        ClassifierSettings {
            future_candles: horizon,
            ..ClassifierSettings::default()
        }
    }

    #[test]
    fn test_labels_follow_future_extremes() {
        let series = series_from_closes(&[100.0, 100.0, 106.0, 100.0, 94.0, 95.0, 96.0]);
        let labels = label_rows(&series.rows, &settings(2));

        assert_eq!(labels[0], Some(Signal::Buy));
        // Bar 2 sees the drop to 94 (-11%)
        assert_eq!(labels[2], Some(Signal::Sell));
        assert_eq!(labels[4], Some(Signal::Neutral));
        assert_eq!(labels[5], None);
        assert_eq!(labels[6], None);
    }

    #[test]
    fn test_buy_takes_priority() {
        let series = series_from_closes(&[100.0, 90.0, 110.0, 100.0]);
        let labels = label_rows(&series.rows, &settings(2));
        assert_eq!(labels[0], Some(Signal::Buy));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly +5% does not qualify
        let series = series_from_closes(&[100.0, 105.0, 100.0]);
        let labels = label_rows(&series.rows, &settings(1));
        assert_eq!(labels[0], Some(Signal::Neutral));
    }

    #[test]
    fn test_training_set_skips_warmup_rows() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 8.0).collect();
        let series = series_from_closes(&closes);

        let mut set = TrainingSet::default();
        set.extend_from(&series, &settings(10));

        assert!(!set.is_empty());
        assert!(set.len() < 70);
        assert!(set.features.iter().all(|f| f.len() == 9));
        assert_eq!(set.class_counts().iter().sum::<usize>(), set.len());
    }
}
