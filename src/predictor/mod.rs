//! Conflict prediction
//!
//! [`ConflictPredictor`] turns a [`FeatureRecord`] into a [`Prediction`]
//! using the trained classifier when one is available and the
//! [heuristic](heuristic_prediction) otherwise. Prediction never fails: any
//! inference error falls back to the heuristic for that call.
//!
//! # Model status
//!
//! | Status | Meaning | Prediction path |
//! |--------|---------|-----------------|
//! | `Unloaded` | No model constructed | Heuristic |
//! | `Untrained` | Fresh classifier awaiting training | Heuristic |
//! | `Trained` | Artifact loaded | Classifier, heuristic on error |

mod heuristic;

pub use self::heuristic::{
    heuristic_prediction, FACTOR_BUSY_BASE, FACTOR_LARGE_CHANGES, FACTOR_LONG_LIVED,
    FACTOR_MANY_FILES, MAX_HEURISTIC_PROBABILITY,
};

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::features::{FeatureRecord, FACTOR_LABELS, FEATURE_NAMES, NUM_FEATURES};
use crate::model::{ModelArtifact, ModelMetrics, TrainingConfig, DEFAULT_VERSION};
use crate::Result;

/// Importance a feature must exceed to be reported as a factor
pub const FACTOR_IMPORTANCE_THRESHOLD: f64 = 0.1;

/// Maximum number of classifier-derived factors
pub const MAX_MODEL_FACTORS: usize = 3;

/// Which path produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Trained classifier
    Model,
    /// Heuristic risk model
    Heuristic,
}

/// Conflict probability with the factors that drove it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of a merge conflict (0.0 to 1.0)
    pub probability: f64,
    /// Human-readable contributing factors
    pub factors: Vec<String>,
    /// Path that produced this prediction
    pub source: PredictionSource,
}

/// Lifecycle state of the predictor's model
#[derive(Debug)]
pub enum ModelStatus {
    /// No model has been constructed
    Unloaded,
    /// A fresh classifier configuration with no learned weights
    Untrained(TrainingConfig),
    /// A trained artifact
    Trained(Box<ModelArtifact>),
}

impl ModelStatus {
    /// Short lowercase name of the status
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Untrained(_) => "untrained",
            Self::Trained(_) => "trained",
        }
    }
}

/// Merge-conflict predictor over a (possibly untrained) model
#[derive(Debug)]
pub struct ConflictPredictor {
    status: ModelStatus,
    version: String,
}

impl Default for ConflictPredictor {
    fn default() -> Self {
        Self::unloaded()
    }
}

impl ConflictPredictor {
    /// Create a predictor with no model (heuristic only)
    #[must_use]
    pub fn unloaded() -> Self {
        Self {
            status: ModelStatus::Unloaded,
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Create a predictor holding a fresh, untrained classifier configuration
    #[must_use]
    pub fn untrained(config: TrainingConfig) -> Self {
        Self {
            status: ModelStatus::Untrained(config),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Create a predictor serving a trained artifact
    #[must_use]
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            version: artifact.version.clone(),
            status: ModelStatus::Trained(Box::new(artifact)),
        }
    }

    /// Load the artifact under `dir`, or fall back to an untrained model
    ///
    /// Never fails: a missing artifact is logged as a warning, a broken one
    /// as an error.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        match ModelArtifact::load(dir) {
            Ok(Some(artifact)) => Self::from_artifact(artifact),
            Ok(None) => {
                warn!(dir = %dir.display(), "no pre-trained model found, initializing new model");
                Self::untrained(TrainingConfig::default())
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "error loading model");
                Self::untrained(TrainingConfig::default())
            }
        }
    }

    /// Predict conflict probability and contributing factors
    #[must_use]
    pub fn predict(&self, features: &FeatureRecord) -> Prediction {
        let ModelStatus::Trained(artifact) = &self.status else {
            return heuristic_prediction(features);
        };

        match model_prediction(artifact, features) {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(error = %e, "model prediction failed, using heuristic");
                heuristic_prediction(features)
            }
        }
    }

    /// Whether a model (trained or not) has been constructed
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !matches!(self.status, ModelStatus::Unloaded)
    }

    /// Current model status
    #[must_use]
    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    /// Model version tag
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Feature names in classifier input order
    #[must_use]
    pub fn feature_names(&self) -> &'static [&'static str; NUM_FEATURES] {
        &FEATURE_NAMES
    }

    /// Training metrics of the loaded artifact, if any
    #[must_use]
    pub fn metrics(&self) -> Option<(&ModelMetrics, chrono::DateTime<chrono::Utc>)> {
        match &self.status {
            ModelStatus::Trained(artifact) => {
                artifact.metrics.as_ref().map(|m| (m, artifact.trained_at))
            }
            _ => None,
        }
    }
}

fn model_prediction(artifact: &ModelArtifact, features: &FeatureRecord) -> Result<Prediction> {
    let vector = features.to_array();
    let scaled = artifact.scaler.transform(&vector);
    let probability = artifact.classifier.predict_proba(&scaled)?;

    Ok(Prediction {
        probability,
        factors: contributing_factors(&artifact.importances),
        source: PredictionSource::Model,
    })
}

/// Top classifier features by importance, as factor labels
///
/// At most [`MAX_MODEL_FACTORS`] labels, in descending importance, each
/// with importance above [`FACTOR_IMPORTANCE_THRESHOLD`].
#[must_use]
pub fn contributing_factors(importances: &[f64; NUM_FEATURES]) -> Vec<String> {
    let mut ranked: Vec<usize> = (0..NUM_FEATURES).collect();
    ranked.sort_by(|&a, &b| importances[b].total_cmp(&importances[a]));

    ranked
        .into_iter()
        .take(MAX_MODEL_FACTORS)
        .filter(|&i| importances[i] > FACTOR_IMPORTANCE_THRESHOLD)
        .map(|i| FACTOR_LABELS[i].to_string())
        .collect()
}

/// Shared, atomically swappable handle to the live predictor
///
/// Readers take a snapshot `Arc`; [`replace`](Self::replace) publishes a
/// fully built predictor in one pointer swap.
#[derive(Debug, Clone)]
pub struct PredictorHandle {
    inner: Arc<RwLock<Arc<ConflictPredictor>>>,
}

impl PredictorHandle {
    /// Wrap a predictor
    #[must_use]
    pub fn new(predictor: ConflictPredictor) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(predictor))),
        }
    }

    /// Snapshot of the live predictor
    #[must_use]
    pub fn current(&self) -> Arc<ConflictPredictor> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new predictor, returning the previous one
    pub fn replace(&self, predictor: ConflictPredictor) -> Arc<ConflictPredictor> {
        let next = Arc::new(predictor);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            from = guard.version(),
            to = next.version(),
            status = next.status().name(),
            "predictor swapped"
        );
        std::mem::replace(&mut *guard, next)
    }
}
