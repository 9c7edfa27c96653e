//! Model artifact: classifier, scaler and the metadata trained with them
//!
//! An artifact is persisted as two JSON files under a model directory:
//! - `conflict_predictor.json`: classifier trees, importances, version, metrics
//! - `scaler.json`: feature scaler statistics
//!
//! Files are written to a temporary path and renamed into place, so a reader
//! loading concurrently with a training job never sees a partial file.

mod classifier;
mod evaluator;
mod scaler;
mod training;

pub use self::classifier::GbdtClassifier;
pub use self::evaluator::{
    log_loss, permutation_importance, roc_auc, ConfusionMatrix, ModelMetrics,
};
pub use self::scaler::{FeatureScaler, ScalerStats};
pub use self::training::{parse_samples, train, TrainingConfig, TrainingSample};

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::{FEATURE_NAMES, NUM_FEATURES};
use crate::{Error, Result};

/// Classifier file name inside the model directory
pub const MODEL_FILE: &str = "conflict_predictor.json";

/// Scaler file name inside the model directory
pub const SCALER_FILE: &str = "scaler.json";

/// Version reported when no trained artifact is loaded
pub const DEFAULT_VERSION: &str = "1.0.0";

/// A trained classifier with everything needed to serve it
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Version tag of this artifact
    pub version: String,
    /// When training finished
    pub trained_at: DateTime<Utc>,
    /// Feature names in the order the classifier was trained on
    pub feature_names: Vec<String>,
    /// Normalized feature importances, in feature order
    pub importances: [f64; NUM_FEATURES],
    /// Evaluation metrics from training, if recorded
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
    /// Trained gradient-boosting classifier
    pub classifier: GbdtClassifier,
    /// Feature scaler (stored in its own file)
    #[serde(skip)]
    pub scaler: FeatureScaler,
}

impl ModelArtifact {
    /// Load an artifact from `dir`
    ///
    /// Returns `Ok(None)` when either file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, or if the stored
    /// feature names do not match this build's feature order.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let model_path = dir.join(MODEL_FILE);
        let scaler_path = dir.join(SCALER_FILE);

        if !model_path.exists() || !scaler_path.exists() {
            return Ok(None);
        }

        let mut artifact: Self = serde_json::from_str(&fs::read_to_string(&model_path)?)?;
        artifact.scaler = serde_json::from_str(&fs::read_to_string(&scaler_path)?)?;

        if artifact.feature_names != FEATURE_NAMES {
            return Err(Error::Model(format!(
                "artifact feature order {:?} does not match expected {:?}",
                artifact.feature_names, FEATURE_NAMES
            )));
        }
        if artifact.importances.iter().any(|v| !v.is_finite()) {
            return Err(Error::Model("artifact importances are not finite".to_string()));
        }

        info!(path = %model_path.display(), version = %artifact.version, "model loaded");
        Ok(Some(artifact))
    }

    /// Save the artifact to `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        // Scaler first: a reader needs both files, and the classifier file
        // carries the version that marks the artifact as new.
        write_atomic(&dir.join(SCALER_FILE), &serde_json::to_string(&self.scaler)?)?;
        write_atomic(&dir.join(MODEL_FILE), &serde_json::to_string(self)?)?;

        info!(path = %dir.join(MODEL_FILE).display(), version = %self.version, "model saved");
        Ok(())
    }
}

fn write_atomic(dest: &Path, contents: &str) -> Result<()> {
    let tmp = dest.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, dest)?;
    Ok(())
}
