//! HTTP API
//!
//! Thin axum layer over the extractor and predictor:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/health` | Liveness and model status |
//! | POST | `/predict/conflict` | Predict one pull request |
//! | POST | `/predict/batch` | Predict `{prs: [...]}` |
//! | GET | `/model/metrics` | Metrics recorded at training |
//! | POST | `/model/retrain` | Reload the published artifact and swap it in |

mod handlers;

pub use self::handlers::{BatchItem, ConflictResponse, RiskLevel};

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::features::FeatureExtractor;
use crate::predictor::PredictorHandle;

/// Probability above which a PR is labelled `conflict`
pub const CONFLICT_THRESHOLD: f64 = 0.7;

/// Shared state injected into every handler
#[derive(Debug, Clone)]
pub struct AppState {
    extractor: FeatureExtractor,
    predictor: PredictorHandle,
    model_dir: Arc<PathBuf>,
}

impl AppState {
    /// Build state from an extractor, a predictor handle and the model directory
    #[must_use]
    pub fn new(extractor: FeatureExtractor, predictor: PredictorHandle, model_dir: PathBuf) -> Self {
        Self {
            extractor,
            predictor,
            model_dir: Arc::new(model_dir),
        }
    }

    /// Handle to the live predictor
    #[must_use]
    pub fn predictor(&self) -> &PredictorHandle {
        &self.predictor
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict/conflict", post(handlers::predict_conflict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model/metrics", get(handlers::model_metrics))
        .route("/model/retrain", post(handlers::retrain_model))
        .with_state(state)
}
