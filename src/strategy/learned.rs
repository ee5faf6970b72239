//! Gradient-boosted signal classifier with a confidence gate

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierSettings;
use crate::error::Error;
use crate::indicators::{FeaturePipeline, FeatureRow, FEATURE_COLUMNS};
use crate::models::{AssetSeries, Decision, Signal};
use crate::strategy::gbm::{balanced_sample_weights, GradientBoostingClassifier};
use crate::strategy::labels::TrainingSet;
use crate::strategy::SignalClassifier;
use crate::Result;

/// Share of the assembled rows kept aside for the threshold report
const EVALUATION_FRACTION: f64 = 0.2;

/// Persisted model: weights, the feature columns it expects and its class labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: GradientBoostingClassifier,
    pub feature_columns: Vec<String>,
    pub classes: Vec<Signal>,
}

impl ModelArtifact {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        if artifact.feature_columns != FEATURE_COLUMNS {
            return Err(Error::Model(format!(
                "Artifact expects features {:?}",
                artifact.feature_columns
            )));
        }
        if artifact.classes.len() != artifact.model.n_classes() {
            return Err(Error::Model(format!(
                "Artifact lists {} classes but the model has {}",
                artifact.classes.len(),
                artifact.model.n_classes()
            )));
        }
        Ok(artifact)
    }
}

/// Precision and recall for BUY and SELL at one confidence threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdReport {
    pub threshold: f64,
    pub buy_precision: f64,
    pub buy_recall: f64,
    pub sell_precision: f64,
    pub sell_recall: f64,
}

#[derive(Debug, Clone)]
pub struct LearnedClassifier {
    artifact: ModelArtifact,
    confidence_threshold: f64,
}

impl LearnedClassifier {
    pub fn from_artifact(artifact: ModelArtifact, confidence_threshold: f64) -> Self {
        Self {
            artifact,
            confidence_threshold,
        }
    }

    /// Train on every symbol's history minus its most recent `training_holdout_bars`
    pub fn train(
        pipeline: &FeaturePipeline,
        series: &[AssetSeries],
        settings: &ClassifierSettings,
    ) -> Result<Self> {
        let mut training = TrainingSet::default();
        for s in series {
            if s.len() <= settings.training_holdout_bars {
                tracing::info!(
                    "Skipping {}: {} bars do not exceed the {}-bar holdout",
                    s.symbol,
                    s.len(),
                    settings.training_holdout_bars
                );
                continue;
            }
            let history = AssetSeries::new(
                s.symbol.clone(),
                s.candles[..s.len() - settings.training_holdout_bars].to_vec(),
            );
            training.extend_from(&pipeline.enrich(&history), settings);
        }
        Self::fit(&training, settings)
    }

    /// Fit on an assembled training set and log the threshold sweep
    pub fn fit(training: &TrainingSet, settings: &ClassifierSettings) -> Result<Self> {
        if training.is_empty() {
            return Err(Error::Model("No valid data to train on".to_string()));
        }

        let mut order: Vec<usize> = (0..training.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(settings.boosting.random_state));
        let evaluation_len = (training.len() as f64 * EVALUATION_FRACTION) as usize;
        let (evaluation_rows, fit_rows) = order.split_at(evaluation_len);

        let classes = Signal::ALL.to_vec();
        let features: Vec<Vec<f64>> = fit_rows
            .iter()
            .map(|&i| training.features[i].clone())
            .collect();
        let labels: Vec<usize> = fit_rows
            .iter()
            .map(|&i| class_index(&classes, training.labels[i]))
            .collect();
        let weights = balanced_sample_weights(&labels, classes.len());

        let [buy, sell, neutral] = training.class_counts();
        tracing::info!(
            "Training on {} rows (BUY {}, SELL {}, NEUTRAL {})",
            features.len(),
            buy,
            sell,
            neutral
        );

        let model = GradientBoostingClassifier::fit(
            &features,
            &labels,
            &weights,
            classes.len(),
            &settings.boosting,
        )?;
        tracing::info!("Model trained with {} boosting iterations", model.n_iterations());

        let classifier = Self::from_artifact(
            ModelArtifact {
                model,
                feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                classes,
            },
            settings.confidence_threshold,
        );

        if !evaluation_rows.is_empty() {
            let features: Vec<Vec<f64>> = evaluation_rows
                .iter()
                .map(|&i| training.features[i].clone())
                .collect();
            let labels: Vec<Signal> = evaluation_rows.iter().map(|&i| training.labels[i]).collect();
            for report in classifier.threshold_sweep(&features, &labels) {
                tracing::info!(
                    "threshold {:.2}: BUY precision {:.2} recall {:.2} | SELL precision {:.2} recall {:.2}",
                    report.threshold,
                    report.buy_precision,
                    report.buy_recall,
                    report.sell_precision,
                    report.sell_recall
                );
            }
        }

        Ok(classifier)
    }

    pub fn with_threshold(mut self, confidence_threshold: f64) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Most probable class and its probability
    pub fn predict(&self, features: &[f64]) -> (Signal, f64) {
        let proba = self.artifact.model.predict_proba(features);
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        (self.artifact.classes[best], proba[best])
    }

    /// Gate a prediction on confidence (inclusive)
    fn gate(&self, signal: Signal, confidence: f64, threshold: f64) -> Decision {
        if confidence >= threshold {
            Decision::new(signal, confidence)
        } else {
            Decision::neutral()
        }
    }

    /// Precision/recall sweep over thresholds 0.30, 0.35, ..., 0.95
    pub fn threshold_sweep(&self, features: &[Vec<f64>], labels: &[Signal]) -> Vec<ThresholdReport> {
        let predictions: Vec<(Signal, f64)> = features.iter().map(|f| self.predict(f)).collect();

        (6..20)
            .map(|step| {
                let threshold = step as f64 * 0.05;
                let gated: Vec<Signal> = predictions
                    .iter()
                    .map(|&(signal, confidence)| self.gate(signal, confidence, threshold).signal)
                    .collect();
                let (buy_precision, buy_recall) = precision_recall(&gated, labels, Signal::Buy);
                let (sell_precision, sell_recall) = precision_recall(&gated, labels, Signal::Sell);
                ThresholdReport {
                    threshold,
                    buy_precision,
                    buy_recall,
                    sell_precision,
                    sell_recall,
                }
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.artifact.to_bytes()?)?;
        tracing::info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path, confidence_threshold: f64) -> Result<Self> {
        let artifact = ModelArtifact::from_bytes(&std::fs::read(path)?)?;
        tracing::info!("Model loaded from {}", path.display());
        Ok(Self::from_artifact(artifact, confidence_threshold))
    }
}

impl SignalClassifier for LearnedClassifier {
    fn classify(&self, row: &FeatureRow) -> Decision {
        let Some(features) = row.feature_vector() else {
            return Decision::neutral();
        };
        let (signal, confidence) = self.predict(&features);
        self.gate(signal, confidence, self.confidence_threshold)
    }

    fn name(&self) -> &str {
        "Gradient Boosting"
    }
}

fn class_index(classes: &[Signal], label: Signal) -> usize {
    classes.iter().position(|c| *c == label).unwrap_or(0)
}

fn precision_recall(predicted: &[Signal], actual: &[Signal], class: Signal) -> (f64, f64) {
    let true_positive = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| **p == class && **a == class)
        .count() as f64;
    let predicted_count = predicted.iter().filter(|p| **p == class).count() as f64;
    let actual_count = actual.iter().filter(|a| **a == class).count() as f64;

    let precision = if predicted_count > 0.0 {
        true_positive / predicted_count
    } else {
        0.0
    };
    let recall = if actual_count > 0.0 {
        true_positive / actual_count
    } else {
        0.0
    };
    (precision, recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::EnrichedSeries;
    use crate::models::Candle;
    use crate::strategy::gbm::BoostingParams;
    use crate::strategy::labels::label_rows;
    use chrono::{Duration, Utc};

    const CYCLE: usize = 20;

    fn settings() -> ClassifierSettings {
        ClassifierSettings {
            boosting: BoostingParams {
                max_iter: 100,
                learning_rate: 0.3,
                max_depth: 3,
                min_samples_leaf: 1,
                validation_fraction: 0.0,
                ..BoostingParams::default()
            },
            ..ClassifierSettings::default()
        }
    }

    /// Sawtooth prices: 10 bars up 1.2% each, 10 bars down 1.2% each. The
    /// phase in the cycle is exposed as the RSI feature, so it fully
    /// determines the forward label.
    fn sawtooth(cycles: usize) -> EnrichedSeries {
        let start = Utc::now();
        let mut close = 100.0;
        let rows = (0..cycles * CYCLE)
            .map(|i| {
                if i > 0 {
                    close *= if (i - 1) % CYCLE < CYCLE / 2 { 1.012 } else { 0.988 };
                }
                FeatureRow {
                    candle: Candle {
                        timestamp: start + Duration::hours(i as i64),
                        open: close,
                        high: close * 1.001,
                        low: close * 0.999,
                        close,
                        volume: 100.0,
                    },
                    rsi: Some((i % CYCLE) as f64),
                    stoch_k: Some(0.5),
                    stoch_d: Some(0.5),
                    bollinger_upper: None,
                    bollinger_lower: None,
                    bollinger_width: Some(0.5),
                    bollinger_position: Some(0.5),
                    macd: Some(0.5),
                    macd_signal: Some(0.5),
                    macd_hist: Some(0.5),
                    atr: None,
                    volume_change: 0.0,
                    swing: 0,
                    trend_support_score: 0,
                    trend_support_line: None,
                    trend_resistance_score: 0,
                    trend_resistance_line: None,
                    trend_touch: 0,
                }
            })
            .collect();
        EnrichedSeries {
            symbol: "SAW".to_string(),
            rows,
        }
    }

    fn trained(series: &EnrichedSeries) -> LearnedClassifier {
        let mut training = TrainingSet::default();
        training.extend_from(series, &settings());
        LearnedClassifier::fit(&training, &settings()).unwrap()
    }

    #[test]
    fn test_label_round_trip_at_threshold() {
        let series = sawtooth(20);
        let labels = label_rows(&series.rows, &settings());
        let clf = trained(&series);

        let mut directional = 0;
        for (row, label) in series.rows.iter().zip(&labels) {
            let Some(label) = label else { continue };
            let features = row.feature_vector().unwrap();
            let (_, confidence) = clf.predict(&features);

            // Threshold exactly at the confidence still passes the gate
            let at = clf.clone().with_threshold(confidence).classify(row);
            assert_eq!(at.signal, *label);
            assert_eq!(at.strength, confidence);

            let above = clf.clone().with_threshold(confidence + 1e-9).classify(row);
            assert_eq!(above, Decision::neutral());

            if *label != Signal::Neutral {
                directional += 1;
            }
        }
        assert!(directional > 0);
    }

    #[test]
    fn test_missing_features_skip_the_model() {
        let mut series = sawtooth(4);
        let clf = trained(&sawtooth(10)).with_threshold(0.0);
        series.rows[3].macd = None;
        assert_eq!(clf.classify(&series.rows[3]), Decision::neutral());
    }

    #[test]
    fn test_batch_matches_row_inference() {
        let series = sawtooth(10);
        let clf = trained(&series);
        let batch = clf.classify_all(&series);
        assert_eq!(batch.len(), series.len());
        for (row, decision) in series.rows.iter().zip(&batch) {
            assert_eq!(clf.classify(row), *decision);
            let (_, confidence) = clf.predict(&row.feature_vector().unwrap());
            if confidence < clf.confidence_threshold() {
                assert_eq!(*decision, Decision::neutral());
            } else {
                assert_eq!(decision.strength, confidence);
            }
        }
    }

    #[test]
    fn test_confident_neutral_keeps_its_confidence() {
        let series = sawtooth(10);
        let clf = trained(&series);

        let mut confident_neutral = 0;
        for row in &series.rows {
            let (signal, confidence) = clf.predict(&row.feature_vector().unwrap());
            if signal != Signal::Neutral || confidence < clf.confidence_threshold() {
                continue;
            }
            let decision = clf.classify(row);
            assert_eq!(decision.signal, Signal::Neutral);
            assert_eq!(decision.strength, confidence);
            assert!(decision.strength > 0.0);
            confident_neutral += 1;
        }
        assert!(confident_neutral > 0);
    }

    #[test]
    fn test_threshold_sweep_shape() {
        let series = sawtooth(10);
        let clf = trained(&series);
        let mut training = TrainingSet::default();
        training.extend_from(&series, &settings());

        let reports = clf.threshold_sweep(&training.features, &training.labels);
        assert_eq!(reports.len(), 14);
        assert!((reports[0].threshold - 0.30).abs() < 1e-9);
        assert!((reports[13].threshold - 0.95).abs() < 1e-9);
        for r in &reports {
            for v in [r.buy_precision, r.buy_recall, r.sell_precision, r.sell_recall] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let result = LearnedClassifier::fit(&TrainingSet::default(), &settings());
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn test_short_histories_are_skipped() {
        let pipeline = FeaturePipeline::new(&crate::config::Settings::default());
        let series = vec![AssetSeries::new("SHORT", Vec::new())];
        let result = LearnedClassifier::train(&pipeline, &series, &settings());
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_artifact() {
        let series = sawtooth(10);
        let clf = trained(&series);
        let path = std::env::temp_dir().join(format!("trendbot-model-{}.json", std::process::id()));

        clf.save(&path).unwrap();
        let loaded = LearnedClassifier::load(&path, clf.confidence_threshold()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.artifact().classes, Signal::ALL.to_vec());
        assert_eq!(loaded.artifact().feature_columns, FEATURE_COLUMNS);
        assert_eq!(
            loaded.artifact().to_bytes().unwrap(),
            clf.artifact().to_bytes().unwrap()
        );
        for row in &series.rows {
            assert_eq!(loaded.classify(row), clf.classify(row));
        }
    }

    #[test]
    fn test_artifact_rejects_foreign_columns() {
        let clf = trained(&sawtooth(10));
        let mut artifact = clf.artifact().clone();
        artifact.feature_columns.pop();
        let bytes = artifact.to_bytes().unwrap();
        assert!(ModelArtifact::from_bytes(&bytes).is_err());
    }
}
