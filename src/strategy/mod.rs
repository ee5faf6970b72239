// Signal classification
pub mod gbm;
pub mod labels;
pub mod learned;
pub mod rules;

pub use learned::{LearnedClassifier, ModelArtifact, ThresholdReport};
pub use rules::RuleClassifier;

use crate::indicators::{EnrichedSeries, FeatureRow};
use crate::models::Decision;

/// Base trait for all signal classifiers
pub trait SignalClassifier: Send + Sync {
    /// Classify one feature row; undefined features yield NEUTRAL
    fn classify(&self, row: &FeatureRow) -> Decision;

    /// Classify every row of an enriched series
    fn classify_all(&self, series: &EnrichedSeries) -> Vec<Decision> {
        series.rows.iter().map(|row| self.classify(row)).collect()
    }

    /// Get classifier name
    fn name(&self) -> &str;
}
