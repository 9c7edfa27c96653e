//! Heuristic merge-conflict risk model
//!
//! Additive, capped scoring over a [`FeatureRecord`]. Used whenever no
//! trained classifier is available and as the fallback when inference fails.
//! Pure arithmetic over defaulted fields, so it cannot fail.
//!
//! | Condition | Contribution |
//! |-----------|--------------|
//! | files_changed > 20 (else > 10) | 0.30 (0.15) |
//! | additions + deletions > 500 (else > 200) | 0.25 (0.15) |
//! | branch_age_days > 7 (else > 3) | 0.20 (0.10) |
//! | base_branch_commits_since_branch > 50 | 0.25 |
//! | overlapping_files_ratio > 0.5 | 0.30 |
//!
//! The sum is capped at [`MAX_HEURISTIC_PROBABILITY`].

use super::{Prediction, PredictionSource};
use crate::features::FeatureRecord;

/// Ceiling on heuristic probability; the heuristic never claims certainty
pub const MAX_HEURISTIC_PROBABILITY: f64 = 0.95;

/// Factor label for many changed files
pub const FACTOR_MANY_FILES: &str = "High number of file changes";
/// Factor label for large diffs
pub const FACTOR_LARGE_CHANGES: &str = "Large code changes";
/// Factor label for old branches
pub const FACTOR_LONG_LIVED: &str = "Long-lived feature branch";
/// Factor label for busy base branches
pub const FACTOR_BUSY_BASE: &str = "Many commits in base branch";

/// Score a feature record with the heuristic risk model
#[must_use]
pub fn heuristic_prediction(features: &FeatureRecord) -> Prediction {
    Prediction {
        probability: risk_score(features),
        factors: heuristic_factors(features),
        source: PredictionSource::Heuristic,
    }
}

fn risk_score(features: &FeatureRecord) -> f64 {
    let mut score = 0.0;

    if features.files_changed > 20 {
        score += 0.30;
    } else if features.files_changed > 10 {
        score += 0.15;
    }

    let total_changes = features.total_changes();
    if total_changes > 500 {
        score += 0.25;
    } else if total_changes > 200 {
        score += 0.15;
    }

    if features.branch_age_days > 7 {
        score += 0.20;
    } else if features.branch_age_days > 3 {
        score += 0.10;
    }

    if features.base_branch_commits_since_branch > 50 {
        score += 0.25;
    }

    if features.overlapping_files_ratio > 0.5 {
        score += 0.30;
    }

    f64::min(score, MAX_HEURISTIC_PROBABILITY)
}

// Thresholds here are looser than the scoring tiers and the list is not
// capped at three, unlike the classifier's factors.
fn heuristic_factors(features: &FeatureRecord) -> Vec<String> {
    let mut factors = Vec::new();

    if features.files_changed > 10 {
        factors.push(FACTOR_MANY_FILES.to_string());
    }
    if features.total_changes() > 200 {
        factors.push(FACTOR_LARGE_CHANGES.to_string());
    }
    if features.branch_age_days > 3 {
        factors.push(FACTOR_LONG_LIVED.to_string());
    }
    if features.base_branch_commits_since_branch > 20 {
        factors.push(FACTOR_BUSY_BASE.to_string());
    }

    factors
}
