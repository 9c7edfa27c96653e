//! Gradient-boosting classifier wrapper
//!
//! Wraps `gbdt::gradient_boost::GBDT` trained with the log-likelihood loss,
//! so predictions come back as positive-class probabilities. Labels follow
//! the crate's convention: `1.0` for conflict, `-1.0` for clean merge.
//!
//! The gbdt crate works in `f32`; feature rows are `f64` everywhere else in
//! mergerisk and are converted at this boundary.

use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use super::training::TrainingConfig;
use crate::features::NUM_FEATURES;
use crate::{Error, Result};

fn row_to_f32(row: &[f64; NUM_FEATURES]) -> Vec<f32> {
    row.iter().map(|&v| v as f32).collect()
}

/// Trained gradient-boosting conflict classifier
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct GbdtClassifier {
    model: GBDT,
}

impl std::fmt::Debug for GbdtClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbdtClassifier").finish_non_exhaustive()
    }
}

impl GbdtClassifier {
    /// Fit a classifier on (already scaled) feature rows
    ///
    /// # Errors
    ///
    /// Returns [`Error::Training`] if there are no rows, the label count does
    /// not match, or only one class is present.
    pub fn fit(
        rows: &[[f64; NUM_FEATURES]],
        labels: &[bool],
        config: &TrainingConfig,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Training("no training samples provided".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(Error::Training(format!(
                "row count ({}) does not match label count ({})",
                rows.len(),
                labels.len()
            )));
        }
        if labels.iter().all(|&l| l) || labels.iter().all(|&l| !l) {
            return Err(Error::Training(
                "training data must contain both conflict and clean samples".to_string(),
            ));
        }

        let mut cfg = Config::new();
        cfg.set_feature_size(NUM_FEATURES);
        cfg.set_max_depth(config.max_depth);
        cfg.set_iterations(config.n_estimators);
        cfg.set_shrinkage(config.learning_rate);
        cfg.set_min_leaf_size(config.min_samples_leaf);
        cfg.set_data_sample_ratio(config.subsample);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);

        let mut model = GBDT::new(&cfg);
        let mut training_data: Vec<Data> = rows
            .iter()
            .zip(labels)
            .map(|(row, &conflict)| {
                let label = if conflict { 1.0 } else { -1.0 };
                Data::new_training_data(row_to_f32(row), 1.0, label, None)
            })
            .collect();

        model.fit(&mut training_data);

        Ok(Self { model })
    }

    /// Positive-class (conflict) probability for one scaled row
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if the row is not finite or the model
    /// output is missing or not finite.
    pub fn predict_proba(&self, row: &[f64; NUM_FEATURES]) -> Result<f64> {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::Inference(
                "feature vector contains non-finite values".to_string(),
            ));
        }

        let data = vec![Data::new_test_data(row_to_f32(row), None)];
        let probability = self
            .model
            .predict(&data)
            .first()
            .copied()
            .ok_or_else(|| Error::Inference("classifier returned no prediction".to_string()))?;

        if !probability.is_finite() {
            return Err(Error::Inference(format!(
                "classifier returned non-finite probability {probability}"
            )));
        }

        Ok(f64::from(probability).clamp(0.0, 1.0))
    }

    /// Positive-class probabilities for a batch of scaled rows
    ///
    /// Non-finite outputs are reported as 0.5.
    #[must_use]
    pub fn predict_proba_batch(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }

        let data: Vec<Data> = rows
            .iter()
            .map(|row| Data::new_test_data(row_to_f32(row), None))
            .collect();

        self.model
            .predict(&data)
            .into_iter()
            .map(|p| {
                if p.is_finite() {
                    f64::from(p).clamp(0.0, 1.0)
                } else {
                    0.5
                }
            })
            .collect()
    }
}
