//! Histogram gradient boosting for multi-class classification
//!
//! Softmax boosting over depth-limited regression trees. Features are bucketed
//! into quantile bins once; every tree split is chosen from per-bin gradient and
//! hessian sums. Leaf values are Newton steps, already scaled by the learning
//! rate. Training can stop early on a held-out validation loss.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::check_positive;
use crate::error::Error;
use crate::Result;

const HESSIAN_FLOOR: f64 = 1e-16;
const MIN_SPLIT_GAIN: f64 = 1e-12;
const EARLY_STOP_TOLERANCE: f64 = 1e-7;

/// Boosting hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Maximum number of boosting iterations
    pub max_iter: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    /// Maximum number of quantile bins per feature
    pub max_bins: usize,
    /// Share of the training rows held out for early stopping (0 disables it)
    pub validation_fraction: f64,
    pub n_iter_no_change: usize,
    pub random_state: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 0.02,
            max_depth: 5,
            min_samples_leaf: 20,
            l2_regularization: 0.0,
            max_bins: 64,
            validation_fraction: 0.1,
            n_iter_no_change: 40,
            random_state: 42,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        check_positive("classifier.boosting.learning_rate", self.learning_rate)?;
        if self.max_iter == 0 || self.max_depth == 0 || self.min_samples_leaf == 0 {
            return Err(Error::configuration(
                "classifier.boosting max_iter, max_depth and min_samples_leaf must be positive",
            ));
        }
        if self.max_bins < 2 {
            return Err(Error::configuration(
                "classifier.boosting.max_bins must be at least 2",
            ));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(Error::configuration(
                "classifier.boosting.validation_fraction must be in [0, 1)",
            ));
        }
        if !self.l2_regularization.is_finite() || self.l2_regularization < 0.0 {
            return Err(Error::configuration(
                "classifier.boosting.l2_regularization must be non-negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a node arena, root at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(f64::NAN);
                    // NaN goes right, like any value above the threshold
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Quantile bin edges per feature
struct Binner {
    thresholds: Vec<Vec<f64>>,
}

impl Binner {
    fn fit(features: &[Vec<f64>], n_features: usize, max_bins: usize) -> Self {
        let thresholds = (0..n_features)
            .map(|f| {
                let mut values: Vec<f64> = features
                    .iter()
                    .map(|row| row[f])
                    .filter(|v| v.is_finite())
                    .collect();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();

                if values.len() <= max_bins {
                    values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
                } else {
                    let mut edges: Vec<f64> = (1..max_bins)
                        .map(|b| {
                            let i = b * values.len() / max_bins;
                            (values[i - 1] + values[i]) / 2.0
                        })
                        .collect();
                    edges.dedup();
                    edges
                }
            })
            .collect();
        Self { thresholds }
    }

    fn bin(&self, feature: usize, value: f64) -> usize {
        let edges = &self.thresholds[feature];
        if value.is_nan() {
            return edges.len();
        }
        edges.partition_point(|t| *t < value)
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }
}

#[derive(Clone, Copy, Default)]
struct BinStats {
    gradient: f64,
    hessian: f64,
    count: usize,
}

struct BestSplit {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct TreeBuilder<'a> {
    binned: &'a [Vec<usize>],
    binner: &'a Binner,
    gradients: &'a [f64],
    hessians: &'a [f64],
    params: &'a BoostingParams,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn leaf_value(&self, gradient: f64, hessian: f64) -> f64 {
        -gradient / (hessian + self.params.l2_regularization + HESSIAN_FLOOR)
            * self.params.learning_rate
    }

    fn score(&self, gradient: f64, hessian: f64) -> f64 {
        gradient * gradient / (hessian + self.params.l2_regularization + HESSIAN_FLOOR)
    }

    fn find_split(&self, rows: &[usize], total: BinStats) -> Option<BestSplit> {
        let min_leaf = self.params.min_samples_leaf;
        if rows.len() < 2 * min_leaf {
            return None;
        }
        let parent_score = self.score(total.gradient, total.hessian);
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.binner.thresholds.len() {
            let mut histogram = vec![BinStats::default(); self.binner.n_bins(feature)];
            for &row in rows {
                let stats = &mut histogram[self.binned[row][feature]];
                stats.gradient += self.gradients[row];
                stats.hessian += self.hessians[row];
                stats.count += 1;
            }

            let mut left = BinStats::default();
            for (bin, stats) in histogram.iter().enumerate().take(histogram.len() - 1) {
                left.gradient += stats.gradient;
                left.hessian += stats.hessian;
                left.count += stats.count;

                let right_count = total.count - left.count;
                if left.count < min_leaf || right_count < min_leaf {
                    continue;
                }
                let gain = self.score(left.gradient, left.hessian)
                    + self.score(total.gradient - left.gradient, total.hessian - left.hessian)
                    - parent_score;

                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit { feature, bin, gain });
                }
            }
        }
        best
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let total = rows.iter().fold(BinStats::default(), |mut acc, &row| {
            acc.gradient += self.gradients[row];
            acc.hessian += self.hessians[row];
            acc.count += 1;
            acc
        });

        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(total.gradient, total.hessian),
        });

        if depth >= self.params.max_depth {
            return index;
        }
        let Some(split) = self.find_split(&rows, total) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| self.binned[row][split.feature] <= split.bin);

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: self.binner.thresholds[split.feature][split.bin],
            left,
            right,
        };
        index
    }
}

fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = raw.iter().map(|r| (r - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Multi-class gradient boosting classifier over class indices `0..n_classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    n_classes: usize,
    n_features: usize,
    base_scores: Vec<f64>,
    /// One tree per class per iteration
    rounds: Vec<Vec<RegressionTree>>,
}

impl GradientBoostingClassifier {
    /// Fit on feature rows, class indices and per-row sample weights
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[usize],
        weights: &[f64],
        n_classes: usize,
        params: &BoostingParams,
    ) -> Result<Self> {
        params.validate()?;
        if features.is_empty() {
            return Err(Error::Model("Empty training set".to_string()));
        }
        if features.len() != labels.len() || features.len() != weights.len() {
            return Err(Error::Model(format!(
                "Mismatched training data: {} rows, {} labels, {} weights",
                features.len(),
                labels.len(),
                weights.len()
            )));
        }
        let n_features = features[0].len();
        if features.iter().any(|row| row.len() != n_features) {
            return Err(Error::Model("Ragged feature matrix".to_string()));
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(Error::Model(format!(
                "Label {} outside {} classes",
                bad, n_classes
            )));
        }

        // Seeded train/validation split for early stopping
        let mut order: Vec<usize> = (0..features.len()).collect();
        let validation_len = (features.len() as f64 * params.validation_fraction) as usize;
        let early_stopping = params.n_iter_no_change > 0
            && validation_len > 0
            && features.len() - validation_len >= 2 * params.min_samples_leaf;
        if early_stopping {
            order.shuffle(&mut StdRng::seed_from_u64(params.random_state));
        }
        let (validation_rows, train_rows) = if early_stopping {
            order.split_at(validation_len)
        } else {
            order.split_at(0)
        };

        let mut prior = vec![0.0; n_classes];
        for &row in train_rows {
            prior[labels[row]] += weights[row];
        }
        let prior_total: f64 = prior.iter().sum();
        let base_scores: Vec<f64> = prior
            .iter()
            .map(|w| (w / prior_total.max(HESSIAN_FLOOR)).max(1e-12).ln())
            .collect();

        let mut model = Self {
            n_classes,
            n_features,
            base_scores,
            rounds: Vec::new(),
        };
        if n_classes < 2 {
            return Ok(model);
        }

        let binner = Binner::fit(features, n_features, params.max_bins);
        let binned: Vec<Vec<usize>> = features
            .iter()
            .map(|row| row.iter().enumerate().map(|(f, &v)| binner.bin(f, v)).collect())
            .collect();

        let mut raw: Vec<Vec<f64>> = vec![model.base_scores.clone(); features.len()];
        let mut gradients = vec![0.0; features.len()];
        let mut hessians = vec![0.0; features.len()];

        let mut best_loss = f64::INFINITY;
        let mut stale = 0;

        for iteration in 0..params.max_iter {
            let probabilities: Vec<Vec<f64>> =
                train_rows.iter().map(|&row| softmax(&raw[row])).collect();

            let mut trees = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                for (p, &row) in probabilities.iter().zip(train_rows) {
                    let target = if labels[row] == class { 1.0 } else { 0.0 };
                    gradients[row] = weights[row] * (p[class] - target);
                    hessians[row] = weights[row] * (p[class] * (1.0 - p[class])).max(HESSIAN_FLOOR);
                }

                let mut builder = TreeBuilder {
                    binned: &binned,
                    binner: &binner,
                    gradients: &gradients,
                    hessians: &hessians,
                    params,
                    nodes: Vec::new(),
                };
                builder.build(train_rows.to_vec(), 0);
                trees.push(RegressionTree {
                    nodes: builder.nodes,
                });
            }

            for (row, scores) in raw.iter_mut().enumerate() {
                for (class, tree) in trees.iter().enumerate() {
                    scores[class] += tree.predict(&features[row]);
                }
            }
            model.rounds.push(trees);

            if early_stopping {
                let loss = log_loss(validation_rows, &raw, labels, weights);
                if loss < best_loss - EARLY_STOP_TOLERANCE {
                    best_loss = loss;
                    stale = 0;
                } else {
                    stale += 1;
                    if stale >= params.n_iter_no_change {
                        tracing::debug!(
                            "Early stopping after {} iterations (validation loss {:.5})",
                            iteration + 1,
                            best_loss
                        );
                        break;
                    }
                }
            }
        }

        Ok(model)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_iterations(&self) -> usize {
        self.rounds.len()
    }

    /// Class probabilities for one row
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut raw = self.base_scores.clone();
        for trees in &self.rounds {
            for (class, tree) in trees.iter().enumerate() {
                raw[class] += tree.predict(features);
            }
        }
        softmax(&raw)
    }
}

fn log_loss(rows: &[usize], raw: &[Vec<f64>], labels: &[usize], weights: &[f64]) -> f64 {
    let mut loss = 0.0;
    let mut total_weight = 0.0;
    for &row in rows {
        let p = softmax(&raw[row]);
        loss -= weights[row] * p[labels[row]].max(1e-15).ln();
        total_weight += weights[row];
    }
    if total_weight > 0.0 {
        loss / total_weight
    } else {
        0.0
    }
}

/// Inverse-frequency ("balanced") weights: n_samples / (n_classes * class_count)
pub fn balanced_sample_weights(labels: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count().max(1);
    labels
        .iter()
        .map(|&label| labels.len() as f64 / (present as f64 * counts[label] as f64))
        .collect()
}
