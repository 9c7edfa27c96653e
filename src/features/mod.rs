//! Pull-request feature records
//!
//! A [`FeatureRecord`] is the fixed-shape numeric summary of a pull request
//! consumed by both prediction paths. The vector order produced by
//! [`FeatureRecord::to_array`] is shared by the scaler, the classifier and
//! the importance weights stored in a model artifact.
//!
//! # Feature Vector (10-dim)
//!
//! 1. **files_changed**: Number of files touched by the PR
//! 2. **additions**: Lines added
//! 3. **deletions**: Lines removed
//! 4. **branch_age_days**: Whole days since the PR was opened
//! 5. **base_branch_commits_since_branch**: Commits landed on the base branch since branching
//! 6. **author_experience_score**: Author experience in [0, 1]
//! 7. **overlapping_files_ratio**: Share of files also touched by other open PRs
//! 8. **modified_core_files**: Files matching a core-file keyword
//! 9. **avg_file_complexity**: Average changed lines per file, normalized to [0, 1]
//! 10. **recent_conflicts_count**: Conflicts recently seen on the touched files

mod extractor;

pub use self::extractor::{ExtractionFault, FeatureExtractor, CORE_FILE_PATTERNS};

use serde::{Deserialize, Serialize};

/// Number of features in a [`FeatureRecord`]
pub const NUM_FEATURES: usize = 10;

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "files_changed",
    "additions",
    "deletions",
    "branch_age_days",
    "base_branch_commits_since_branch",
    "author_experience_score",
    "overlapping_files_ratio",
    "modified_core_files",
    "avg_file_complexity",
    "recent_conflicts_count",
];

/// Human-readable feature labels in vector order, used as contributing factors
pub const FACTOR_LABELS: [&str; NUM_FEATURES] = [
    "Files changed",
    "Additions",
    "Deletions",
    "Branch age",
    "Base branch commits",
    "Author experience",
    "Overlapping files",
    "Core files modified",
    "File complexity",
    "Recent conflicts",
];

/// Fixed-shape numeric summary of a pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRecord {
    /// Number of files changed
    pub files_changed: u64,
    /// Lines added
    pub additions: u64,
    /// Lines deleted
    pub deletions: u64,
    /// Whole days since the PR was created
    pub branch_age_days: u64,
    /// Commits on the base branch since the PR branched off
    pub base_branch_commits_since_branch: u64,
    /// Author experience (0.0 = new, 1.0 = experienced)
    pub author_experience_score: f64,
    /// Ratio of files overlapping with other open PRs
    pub overlapping_files_ratio: f64,
    /// Number of changed files that look like core files
    pub modified_core_files: u64,
    /// Normalized average change size per file
    pub avg_file_complexity: f64,
    /// Recent conflicts on the touched files
    pub recent_conflicts_count: u64,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            files_changed: 0,
            additions: 0,
            deletions: 0,
            branch_age_days: 0,
            base_branch_commits_since_branch: 0,
            author_experience_score: 0.5,
            overlapping_files_ratio: 0.0,
            modified_core_files: 0,
            avg_file_complexity: 0.0,
            recent_conflicts_count: 0,
        }
    }
}

impl FeatureRecord {
    /// Total changed lines (additions + deletions)
    #[must_use]
    pub fn total_changes(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }

    /// Convert to the fixed-order feature vector
    #[must_use]
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.files_changed as f64,
            self.additions as f64,
            self.deletions as f64,
            self.branch_age_days as f64,
            self.base_branch_commits_since_branch as f64,
            self.author_experience_score,
            self.overlapping_files_ratio,
            self.modified_core_files as f64,
            self.avg_file_complexity,
            self.recent_conflicts_count as f64,
        ]
    }
}
