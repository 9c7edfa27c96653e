//! Training job for the conflict classifier
//!
//! Fits the scaler and gradient-boosting classifier on labelled feature
//! records, computes permutation importances and holdout metrics, and
//! packages everything as a [`ModelArtifact`] ready to [`save`](ModelArtifact::save).

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::GbdtClassifier;
use super::evaluator::{permutation_importance, ModelMetrics};
use super::scaler::FeatureScaler;
use super::ModelArtifact;
use crate::features::{FeatureExtractor, FeatureRecord, FEATURE_NAMES, NUM_FEATURES};
use crate::{Error, Result};

/// Hyperparameters for a fresh classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Boosting iterations
    pub n_estimators: usize,
    /// Shrinkage applied to each tree
    pub learning_rate: f32,
    /// Maximum tree depth
    pub max_depth: u32,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Seed for the train/holdout shuffle and permutation importance
    pub seed: u64,
    /// Fraction of samples held out for evaluation
    pub holdout_ratio: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 10,
            subsample: 0.8,
            seed: 42,
            holdout_ratio: 0.2,
        }
    }
}

/// One labelled pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    /// Extracted features
    pub features: FeatureRecord,
    /// Whether the pull request ended in a merge conflict
    pub conflict: bool,
}

impl TrainingSample {
    /// Create a new sample
    #[must_use]
    pub fn new(features: FeatureRecord, conflict: bool) -> Self {
        Self { features, conflict }
    }
}

/// Raw training line: `{"pr": {...}, "conflict": bool}`
#[derive(Debug, Deserialize)]
struct RawSample {
    pr: serde_json::Value,
    conflict: bool,
}

/// Parse JSON Lines of raw PR payloads into training samples
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`Error::Serialization`] naming the offending line number.
pub fn parse_samples(jsonl: &str, extractor: &FeatureExtractor) -> Result<Vec<TrainingSample>> {
    jsonl
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let raw: RawSample = serde_json::from_str(line)
                .map_err(|e| Error::Serialization(format!("line {}: {e}", i + 1)))?;
            Ok(TrainingSample::new(extractor.extract(&raw.pr), raw.conflict))
        })
        .collect()
}

/// Train a versioned model artifact
///
/// # Errors
///
/// Returns [`Error::Training`] for invalid configuration, an empty sample
/// set, or samples containing a single class.
pub fn train(
    samples: &[TrainingSample],
    config: &TrainingConfig,
    version: &str,
) -> Result<ModelArtifact> {
    if !(0.0..1.0).contains(&config.holdout_ratio) {
        return Err(Error::Training(format!(
            "holdout ratio must be in [0, 1), got {}",
            config.holdout_ratio
        )));
    }
    if !(config.subsample > 0.0 && config.subsample <= 1.0) {
        return Err(Error::Training(format!(
            "subsample must be in (0, 1], got {}",
            config.subsample
        )));
    }
    if samples.is_empty() {
        return Err(Error::Training("no training samples provided".to_string()));
    }

    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(config.seed));

    let n_holdout = (samples.len() as f64 * config.holdout_ratio).floor() as usize;
    let (holdout_idx, train_idx) = order.split_at(n_holdout);

    let raw_train: Vec<[f64; NUM_FEATURES]> = train_idx
        .iter()
        .map(|&i| samples[i].features.to_array())
        .collect();
    let train_labels: Vec<bool> = train_idx.iter().map(|&i| samples[i].conflict).collect();

    let scaler = FeatureScaler::fit(&raw_train);
    let train_rows: Vec<[f64; NUM_FEATURES]> =
        raw_train.iter().map(|row| scaler.transform(row)).collect();

    let classifier = GbdtClassifier::fit(&train_rows, &train_labels, config)?;

    let importances = permutation_importance(&train_rows, &train_labels, config.seed, |rows| {
        classifier.predict_proba_batch(rows)
    });

    // Without a holdout the metrics describe the training fit.
    let (eval_rows, eval_labels) = if holdout_idx.is_empty() {
        (train_rows.clone(), train_labels.clone())
    } else {
        (
            holdout_idx
                .iter()
                .map(|&i| scaler.transform(&samples[i].features.to_array()))
                .collect(),
            holdout_idx.iter().map(|&i| samples[i].conflict).collect::<Vec<_>>(),
        )
    };
    let scores = classifier.predict_proba_batch(&eval_rows);
    let metrics = ModelMetrics::evaluate(&scores, &eval_labels, train_rows.len());

    info!(
        version,
        training_samples = metrics.training_samples,
        evaluation_samples = metrics.evaluation_samples,
        accuracy = metrics.accuracy,
        auc_roc = metrics.auc_roc,
        "trained conflict classifier"
    );

    Ok(ModelArtifact {
        version: version.to_string(),
        trained_at: Utc::now(),
        feature_names: FEATURE_NAMES.iter().map(ToString::to_string).collect(),
        importances,
        metrics: Some(metrics),
        classifier,
        scaler,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Labelled samples where big, overlapping PRs conflict
    pub(crate) fn synthetic_samples(n: u64) -> Vec<TrainingSample> {
        (0..n)
            .map(|i| {
                let conflict = i % 2 == 0;
                let features = FeatureRecord {
                    files_changed: if conflict { 25 + i % 10 } else { 1 + i % 5 },
                    additions: if conflict { 600 + i } else { 20 + i % 30 },
                    overlapping_files_ratio: if conflict { 0.7 } else { 0.1 },
                    author_experience_score: 0.5,
                    ..FeatureRecord::default()
                };
                TrainingSample::new(features, conflict)
            })
            .collect()
    }

    pub(crate) fn fast_config() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 15,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_default_config_matches_documented_hyperparameters() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_estimators, 100);
        assert!((config.learning_rate - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.min_samples_leaf, 10);
        assert!((config.subsample - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_train_produces_artifact() {
        let samples = synthetic_samples(60);
        let artifact = train(&samples, &fast_config(), "2.0.0").unwrap();

        assert_eq!(artifact.version, "2.0.0");
        assert_eq!(artifact.feature_names.len(), NUM_FEATURES);
        assert!(artifact.scaler.is_fitted());

        let metrics = artifact.metrics.as_ref().unwrap();
        assert_eq!(metrics.training_samples, 48);
        assert_eq!(metrics.evaluation_samples, 12);
        assert!((0.0..=1.0).contains(&metrics.accuracy));

        let total: f64 = artifact.importances.iter().sum();
        assert!(total == 0.0 || (total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_without_holdout_evaluates_on_training_set() {
        let samples = synthetic_samples(20);
        let config = TrainingConfig {
            holdout_ratio: 0.0,
            ..fast_config()
        };
        let artifact = train(&samples, &config, "1.1.0").unwrap();
        let metrics = artifact.metrics.unwrap();
        assert_eq!(metrics.training_samples, 20);
        assert_eq!(metrics.evaluation_samples, 20);
    }

    #[test]
    fn test_train_rejects_bad_input() {
        assert!(matches!(
            train(&[], &fast_config(), "x"),
            Err(Error::Training(_))
        ));

        let bad_holdout = TrainingConfig {
            holdout_ratio: 1.0,
            ..fast_config()
        };
        assert!(train(&synthetic_samples(10), &bad_holdout, "x").is_err());

        let one_class: Vec<TrainingSample> = synthetic_samples(10)
            .into_iter()
            .filter(|s| s.conflict)
            .collect();
        let config = TrainingConfig {
            holdout_ratio: 0.0,
            ..fast_config()
        };
        assert!(train(&one_class, &config, "x").is_err());
    }

    #[test]
    fn test_parse_samples_jsonl() {
        let jsonl = r#"{"pr": {"files_changed": 30, "additions": 700}, "conflict": true}

{"pr": {"files_changed": 2}, "conflict": false}
"#;
        let samples = parse_samples(jsonl, &FeatureExtractor::new()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].features.files_changed, 30);
        assert!(samples[0].conflict);
        assert!(!samples[1].conflict);
    }

    #[test]
    fn test_parse_samples_reports_line() {
        let jsonl = "{\"pr\": {}, \"conflict\": true}\n{\"pr\": {}}\n";
        let err = parse_samples(jsonl, &FeatureExtractor::new()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
