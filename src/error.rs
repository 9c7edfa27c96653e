//! Error types for mergerisk
//!
//! Prediction itself never fails outward: extraction faults collapse to the
//! default feature record and inference faults fall back to the heuristic.
//! These errors surface only from model loading, saving, training and the CLI.

use thiserror::Error;

/// Result type alias for mergerisk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mergerisk operations
#[derive(Error, Debug)]
pub enum Error {
    /// Model artifact could not be loaded or is inconsistent
    #[error("model error: {0}")]
    Model(String),

    /// Classifier inference produced an unusable result
    #[error("inference error: {0}")]
    Inference(String),

    /// Training failed or was given unusable data
    #[error("training error: {0}")]
    Training(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
