//! Model evaluation
//!
//! This module provides the measurements recorded alongside a trained model:
//! - Confusion matrix at a decision threshold
//! - ROC AUC from probability scores
//! - Permutation feature importance (drives the contributing factors)

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::NUM_FEATURES;

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True positives (predicted conflict, actual conflict)
    pub tp: usize,
    /// True negatives (predicted clean, actual clean)
    pub tn: usize,
    /// False positives (predicted conflict, actual clean)
    pub fp: usize,
    /// False negatives (predicted clean, actual conflict)
    pub r#fn: usize,
}

impl ConfusionMatrix {
    /// Build from probability scores thresholded at `threshold` (inclusive)
    #[must_use]
    pub fn from_scores(scores: &[f64], ground_truth: &[bool], threshold: f64) -> Self {
        let mut matrix = Self::default();

        for (&score, &truth) in scores.iter().zip(ground_truth) {
            match (score >= threshold, truth) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.r#fn += 1,
            }
        }

        matrix
    }

    /// Total number of samples
    #[must_use]
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.r#fn
    }

    /// Accuracy = (TP + TN) / total
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Precision = TP / (TP + FP)
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall = TP / (TP + FN)
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.r#fn)
    }

    /// F1 = harmonic mean of precision and recall
    #[must_use]
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            return 0.0;
        }
        2.0 * (precision * recall) / (precision + recall)
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        return 0.0;
    }
    num as f64 / denom as f64
}

/// Area under the ROC curve, by trapezoidal integration
///
/// Returns 0.5 when either class is absent or the inputs disagree in length.
#[must_use]
pub fn roc_auc(scores: &[f64], ground_truth: &[bool]) -> f64 {
    if scores.is_empty() || scores.len() != ground_truth.len() {
        return 0.5;
    }

    let positives = ground_truth.iter().filter(|&&t| t).count();
    let negatives = ground_truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut indexed: Vec<(f64, bool)> = scores.iter().copied().zip(ground_truth.iter().copied()).collect();
    indexed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut prev_tpr, mut prev_fpr) = (0.0, 0.0);
    let mut i = 0;

    // Tied scores advance together so they contribute a diagonal segment.
    while i < indexed.len() {
        let score = indexed[i].0;
        while i < indexed.len() && indexed[i].0.total_cmp(&score).is_eq() {
            if indexed[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let tpr = tp as f64 / positives as f64;
        let fpr = fp as f64 / negatives as f64;
        auc += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }

    auc
}

/// Mean binary log-loss of probability scores
#[must_use]
pub fn log_loss(scores: &[f64], ground_truth: &[bool]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let eps = 1e-15;
    let total: f64 = scores
        .iter()
        .zip(ground_truth)
        .map(|(&p, &truth)| {
            let p = p.clamp(eps, 1.0 - eps);
            if truth {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / scores.len() as f64
}

/// Permutation importance of each feature, normalized to sum to 1
///
/// Each column is shuffled in turn with a seeded RNG and the increase in
/// log-loss over the unshuffled baseline is recorded (floored at 0). When no
/// feature increases the loss every importance is 0.
pub fn permutation_importance<F>(
    rows: &[[f64; NUM_FEATURES]],
    labels: &[bool],
    seed: u64,
    predict: F,
) -> [f64; NUM_FEATURES]
where
    F: Fn(&[[f64; NUM_FEATURES]]) -> Vec<f64>,
{
    let mut importances = [0.0f64; NUM_FEATURES];
    if rows.len() < 2 {
        return importances;
    }

    let baseline = log_loss(&predict(rows), labels);
    let mut rng = StdRng::seed_from_u64(seed);

    for (feature, importance) in importances.iter_mut().enumerate() {
        let mut column: Vec<f64> = rows.iter().map(|row| row[feature]).collect();
        column.shuffle(&mut rng);

        let permuted: Vec<[f64; NUM_FEATURES]> = rows
            .iter()
            .zip(&column)
            .map(|(row, &value)| {
                let mut permuted = *row;
                permuted[feature] = value;
                permuted
            })
            .collect();

        let loss = log_loss(&predict(&permuted), labels);
        *importance = (loss - baseline).max(0.0);
    }

    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        for importance in &mut importances {
            *importance /= total;
        }
    }
    importances
}

/// Evaluation metrics recorded with a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy at a 0.5 threshold
    pub accuracy: f64,
    /// Precision at a 0.5 threshold
    pub precision: f64,
    /// Recall at a 0.5 threshold
    pub recall: f64,
    /// F1 score at a 0.5 threshold
    pub f1_score: f64,
    /// Area under the ROC curve
    pub auc_roc: f64,
    /// Samples used for fitting
    pub training_samples: usize,
    /// Samples the metrics were measured on
    pub evaluation_samples: usize,
}

impl ModelMetrics {
    /// Compute metrics from holdout scores
    #[must_use]
    pub fn evaluate(scores: &[f64], ground_truth: &[bool], training_samples: usize) -> Self {
        let matrix = ConfusionMatrix::from_scores(scores, ground_truth, 0.5);
        Self {
            accuracy: matrix.accuracy(),
            precision: matrix.precision(),
            recall: matrix.recall(),
            f1_score: matrix.f1_score(),
            auc_roc: roc_auc(scores, ground_truth),
            training_samples,
            evaluation_samples: matrix.total(),
        }
    }
}
