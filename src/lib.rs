//! mergerisk - Merge-Conflict Risk Prediction for Pull Requests
//!
//! mergerisk estimates the probability that a pull request will end in a
//! merge conflict. Raw PR payloads are reduced to a fixed ten-feature record
//! (files changed, diff size, branch age, base-branch churn, author
//! experience, file overlap, ...) and scored by a gradient-boosting
//! classifier, or by a deterministic heuristic when no trained model is
//! available.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          MERGERISK                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │  raw PR   →   Feature    →   Feature   →   Conflict           │
//! │  (JSON)       Extractor      Record        Predictor          │
//! │                                              │                │
//! │                                  GBDT model ─┴─ heuristic     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use mergerisk::features::FeatureExtractor;
//! use mergerisk::predictor::ConflictPredictor;
//! use serde_json::json;
//!
//! let extractor = FeatureExtractor::new();
//! let predictor = ConflictPredictor::unloaded();
//!
//! let features = extractor.extract(&json!({
//!     "files_changed": 25,
//!     "additions": 600,
//!     "deletions": 50,
//! }));
//! let prediction = predictor.predict(&features);
//! assert!((prediction.probability - 0.55).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! - [`features`] - Feature records and extraction from raw PR payloads
//! - [`predictor`] - Model/heuristic prediction and the swappable handle
//! - [`model`] - Classifier, scaler, artifact persistence, training
//! - [`api`] - HTTP endpoints (axum)
//! - [`config`] - Service configuration

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod predictor;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::features::{FeatureExtractor, FeatureRecord};
    pub use crate::model::{ModelArtifact, TrainingConfig, TrainingSample};
    pub use crate::predictor::{
        heuristic_prediction, ConflictPredictor, ModelStatus, Prediction, PredictionSource,
        PredictorHandle,
    };
    pub use crate::{Error, Result};
}
