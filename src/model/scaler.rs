//! Z-score feature scaling
//!
//! Mirrors a standard scaler: per-feature mean and population standard
//! deviation learned from the training split. Constant features keep a unit
//! scale so they center to zero instead of dividing by zero.

use serde::{Deserialize, Serialize};

use crate::features::NUM_FEATURES;

/// Statistics learned by [`FeatureScaler::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerStats {
    /// Mean of each feature dimension
    pub mean: [f64; NUM_FEATURES],
    /// Divisor for each feature dimension (std, or 1.0 when constant)
    pub scale: [f64; NUM_FEATURES],
    /// Number of rows the statistics were computed from
    pub n_samples: usize,
}

/// Feature scaler that is either unfitted (identity) or fitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    stats: Option<ScalerStats>,
}

impl FeatureScaler {
    /// Create an unfitted scaler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a scaler to feature rows
    ///
    /// An empty slice yields an unfitted scaler.
    #[must_use]
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }

        let n = rows.len() as f64;

        let mut mean = [0.0f64; NUM_FEATURES];
        for row in rows {
            for (m, &val) in mean.iter_mut().zip(row) {
                *m += val;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = [0.0f64; NUM_FEATURES];
        for row in rows {
            for (i, &val) in row.iter().enumerate() {
                let diff = val - mean[i];
                variance[i] += diff * diff;
            }
        }

        let mut scale = [1.0f64; NUM_FEATURES];
        for (s, v) in scale.iter_mut().zip(variance) {
            let std = (v / n).sqrt();
            if std > f64::EPSILON {
                *s = std;
            }
        }

        Self {
            stats: Some(ScalerStats {
                mean,
                scale,
                n_samples: rows.len(),
            }),
        }
    }

    /// Whether [`fit`](Self::fit) learned statistics
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.stats.is_some()
    }

    /// Learned statistics, if fitted
    #[must_use]
    pub fn stats(&self) -> Option<&ScalerStats> {
        self.stats.as_ref()
    }

    /// Scale a feature row; an unfitted scaler returns the row unchanged
    #[must_use]
    pub fn transform(&self, row: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let Some(stats) = &self.stats else {
            return *row;
        };

        let mut scaled = [0.0f64; NUM_FEATURES];
        for (i, out) in scaled.iter_mut().enumerate() {
            *out = (row[i] - stats.mean[i]) / stats.scale[i];
        }
        scaled
    }
}
