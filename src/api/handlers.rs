use std::path::Path;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{AppState, CONFLICT_THRESHOLD};
use crate::model::ModelArtifact;
use crate::predictor::{ConflictPredictor, Prediction, PredictorHandle};

/// Coarse risk bucket for a conflict probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// p <= 0.5
    Low,
    /// 0.5 < p <= 0.8
    Medium,
    /// p > 0.8
    High,
}

impl RiskLevel {
    /// Bucket a probability
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.8 {
            Self::High
        } else if probability > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ConflictLabel {
    Conflict,
    NoConflict,
}

/// Response body of `POST /predict/conflict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResponse {
    prediction: ConflictLabel,
    /// Conflict probability
    pub confidence: f64,
    /// Risk bucket
    pub risk_level: RiskLevel,
    /// Contributing factors
    pub contributing_factors: Vec<String>,
    /// Version of the serving model
    pub model_version: String,
}

impl ConflictResponse {
    /// Shape a prediction for the API
    #[must_use]
    pub fn new(prediction: Prediction, model_version: &str) -> Self {
        let label = if prediction.probability > CONFLICT_THRESHOLD {
            ConflictLabel::Conflict
        } else {
            ConflictLabel::NoConflict
        };
        Self {
            prediction: label,
            confidence: prediction.probability,
            risk_level: RiskLevel::from_probability(prediction.probability),
            contributing_factors: prediction.factors,
            model_version: model_version.to_string(),
        }
    }

    /// Whether the PR is labelled as a likely conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.prediction == ConflictLabel::Conflict
    }
}

/// One entry of `POST /predict/batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// The PR's `number`, or null
    pub pr_number: Value,
    /// Conflict probability
    pub probability: f64,
    /// Risk bucket
    pub risk_level: RiskLevel,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    version: String,
    model_status: &'static str,
    accuracy: Option<f64>,
    precision: Option<f64>,
    recall: Option<f64>,
    f1_score: Option<f64>,
    auc_roc: Option<f64>,
    last_trained: Option<String>,
    training_samples: Option<usize>,
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.to_string() })),
    )
        .into_response()
}

fn parse_body(body: &Bytes) -> Result<Value, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejected malformed request body");
        bad_request(format!("invalid JSON body: {e}"))
    })
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    let predictor = state.predictor.current();
    Json(json!({
        "status": "ok",
        "model_loaded": predictor.is_loaded(),
        "model_status": predictor.status().name(),
    }))
}

pub(super) async fn predict_conflict(State(state): State<AppState>, body: Bytes) -> Response {
    let pr = match parse_body(&body) {
        Ok(pr) => pr,
        Err(rejection) => return rejection,
    };

    let predictor = state.predictor.current();
    let features = state.extractor.extract(&pr);
    let prediction = predictor.predict(&features);

    Json(ConflictResponse::new(prediction, predictor.version())).into_response()
}

pub(super) async fn predict_batch(State(state): State<AppState>, body: Bytes) -> Response {
    let data = match parse_body(&body) {
        Ok(data) => data,
        Err(rejection) => return rejection,
    };
    let Some(data) = data.as_object() else {
        return bad_request("request body must be an object with a `prs` array");
    };
    let prs = match data.get("prs") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(prs)) => prs.as_slice(),
        Some(_) => return bad_request("`prs` must be an array"),
    };

    // One snapshot for the whole batch so every PR sees the same model.
    let predictor = state.predictor.current();
    let predictions: Vec<BatchItem> = prs
        .iter()
        .map(|pr| {
            let prediction = predictor.predict(&state.extractor.extract(pr));
            BatchItem {
                pr_number: pr.get("number").cloned().unwrap_or(Value::Null),
                probability: prediction.probability,
                risk_level: RiskLevel::from_probability(prediction.probability),
            }
        })
        .collect();

    Json(json!({ "predictions": predictions })).into_response()
}

pub(super) async fn model_metrics(State(state): State<AppState>) -> Json<Value> {
    let predictor = state.predictor.current();
    let metrics = predictor.metrics();

    let response = MetricsResponse {
        version: predictor.version().to_string(),
        model_status: predictor.status().name(),
        accuracy: metrics.map(|(m, _)| m.accuracy),
        precision: metrics.map(|(m, _)| m.precision),
        recall: metrics.map(|(m, _)| m.recall),
        f1_score: metrics.map(|(m, _)| m.f1_score),
        auc_roc: metrics.map(|(m, _)| m.auc_roc),
        last_trained: metrics.map(|(_, at)| at.to_rfc3339()),
        training_samples: metrics.map(|(m, _)| m.training_samples),
    };

    Json(json!(response))
}

pub(super) async fn retrain_model(State(state): State<AppState>) -> Json<Value> {
    let job_id = Uuid::new_v4();
    let handle = state.predictor.clone();
    let model_dir = state.model_dir.clone();

    tokio::task::spawn_blocking(move || reload_artifact(&handle, &model_dir, job_id));

    Json(json!({ "status": "reload_started", "job_id": job_id }))
}

/// Load the artifact published under `model_dir` and swap it in
///
/// The live predictor is kept when no artifact exists or it fails to load.
/// Returns whether a swap happened.
pub(super) fn reload_artifact(handle: &PredictorHandle, model_dir: &Path, job_id: Uuid) -> bool {
    info!(%job_id, dir = %model_dir.display(), "reloading model artifact");
    match ModelArtifact::load(model_dir) {
        Ok(Some(artifact)) => {
            handle.replace(ConflictPredictor::from_artifact(artifact));
            true
        }
        Ok(None) => {
            warn!(%job_id, "no artifact published, keeping current model");
            false
        }
        Err(e) => {
            error!(%job_id, error = %e, "artifact reload failed, keeping current model");
            false
        }
    }
}
