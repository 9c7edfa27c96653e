//! Feature extraction from raw pull-request payloads
//!
//! Payloads come from the GitHub API or the browser extension and are only
//! loosely structured, so extraction works on [`serde_json::Value`]. The
//! public [`FeatureExtractor::extract`] is total: any fault degrades to
//! [`FeatureRecord::default`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::FeatureRecord;

/// Filename keywords marking a core/critical file (compared lowercased)
pub const CORE_FILE_PATTERNS: [&str; 9] = [
    "config",
    "package.json",
    "requirements.txt",
    "dockerfile",
    "schema",
    "migration",
    "core/",
    "lib/",
    "index",
];

/// Changed lines per file treated as maximal complexity
const COMPLEXITY_SATURATION: f64 = 100.0;

/// Contributions treated as a fully experienced author
const EXPERIENCED_CONTRIBUTIONS: f64 = 100.0;

/// Account age (years) treated as a fully experienced author
const EXPERIENCED_ACCOUNT_YEARS: f64 = 5.0;

/// Fault raised while extracting a feature record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionFault {
    /// The payload is not a JSON object
    #[error("pull request payload is not an object")]
    NotAnObject,

    /// A numeric field holds something other than a non-negative number
    #[error("field `{field}` is not a non-negative number: {value}")]
    InvalidNumber {
        /// Payload key that was looked up
        field: &'static str,
        /// Offending value, rendered as JSON
        value: String,
    },

    /// `author` is present but not an object
    #[error("author must be an object, got {0}")]
    InvalidAuthor(String),

    /// An entry of `files` is neither a filename nor a file object
    #[error("files[{index}] is neither a string nor an object")]
    InvalidFileEntry {
        /// Position in the `files` array
        index: usize,
    },
}

/// Extracts [`FeatureRecord`]s from raw pull-request payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract features, measuring branch age against the current time
    #[must_use]
    pub fn extract(&self, pr: &Value) -> FeatureRecord {
        self.extract_at(pr, Utc::now())
    }

    /// Extract features, measuring branch age against `now`
    ///
    /// Never fails: a fault in any sub-extraction yields the default record.
    #[must_use]
    pub fn extract_at(&self, pr: &Value, now: DateTime<Utc>) -> FeatureRecord {
        match self.try_extract(pr, now) {
            Ok(record) => {
                debug!(?record, "extracted pull request features");
                record
            }
            Err(fault) => {
                warn!(%fault, "feature extraction failed, using defaults");
                FeatureRecord::default()
            }
        }
    }

    /// Extract features, surfacing the first fault encountered
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractionFault`] when the payload is not an object or a
    /// field has an unusable shape. Missing fields are never faults.
    pub fn try_extract(
        &self,
        pr: &Value,
        now: DateTime<Utc>,
    ) -> Result<FeatureRecord, ExtractionFault> {
        let pr = pr.as_object().ok_or(ExtractionFault::NotAnObject)?;

        let files_changed = count_field(pr, &["filesChanged", "files_changed"])?;
        let additions = count_field(pr, &["additions"])?.unwrap_or(0);
        let deletions = count_field(pr, &["deletions"])?.unwrap_or(0);

        Ok(FeatureRecord {
            files_changed: files_changed.unwrap_or(0),
            additions,
            deletions,
            branch_age_days: branch_age_days(pr, now),
            base_branch_commits_since_branch: count_field(pr, &["base_branch_commits"])?
                .unwrap_or(0),
            author_experience_score: author_experience(pr)?,
            overlapping_files_ratio: ratio_field(pr, "overlapping_ratio")?.unwrap_or(0.0),
            modified_core_files: count_core_files(pr)?,
            // An absent file count divides by one rather than yielding zero.
            avg_file_complexity: estimate_complexity(
                files_changed.unwrap_or(1),
                additions,
                deletions,
            ),
            recent_conflicts_count: count_field(pr, &["recent_conflicts"])?.unwrap_or(0),
        })
    }
}

/// Look up the first present, non-null key and read it as a count
fn count_field(
    pr: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<u64>, ExtractionFault> {
    let Some((key, value)) = keys
        .iter()
        .find_map(|&key| pr.get(key).filter(|v| !v.is_null()).map(|v| (key, v)))
    else {
        return Ok(None);
    };

    if let Some(n) = value.as_u64() {
        return Ok(Some(n));
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
        _ => Err(ExtractionFault::InvalidNumber {
            field: key,
            value: value.to_string(),
        }),
    }
}

/// Read a non-negative float field
fn number_field(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<f64>, ExtractionFault> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => Ok(Some(f)),
            _ => Err(ExtractionFault::InvalidNumber {
                field: key,
                value: value.to_string(),
            }),
        },
    }
}

/// Read a ratio field, clamped into [0, 1]
fn ratio_field(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<f64>, ExtractionFault> {
    Ok(number_field(obj, key)?.map(|r| r.min(1.0)))
}

/// Whole days between `created_at`/`createdAt` and `now`
///
/// Missing, unparsable or future timestamps yield 0.
fn branch_age_days(pr: &Map<String, Value>, now: DateTime<Utc>) -> u64 {
    let created = ["created_at", "createdAt"]
        .iter()
        .find_map(|&key| pr.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()));

    let Some(created) = created.and_then(parse_timestamp) else {
        return 0;
    };

    u64::try_from((now - created).num_days()).unwrap_or(0)
}

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Saturating blend of contribution count and account age
fn author_experience(pr: &Map<String, Value>) -> Result<f64, ExtractionFault> {
    let author = match pr.get("author") {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Object(author)) => author,
        Some(other) => return Err(ExtractionFault::InvalidAuthor(other.to_string())),
    };

    let contributions = number_field(author, "contributions")?.unwrap_or(0.0);
    let account_age_years = number_field(author, "account_age_years")?.unwrap_or(0.0);

    let score = 0.5 * (contributions / EXPERIENCED_CONTRIBUTIONS)
        + 0.5 * (account_age_years / EXPERIENCED_ACCOUNT_YEARS);
    Ok(score.min(1.0))
}

/// Count changed files whose name contains a core-file keyword
fn count_core_files(pr: &Map<String, Value>) -> Result<u64, ExtractionFault> {
    let Some(Value::Array(files)) = pr.get("files") else {
        return Ok(0);
    };

    let mut core_count = 0;
    for (index, file) in files.iter().enumerate() {
        let filename = match file {
            Value::String(name) => name.as_str(),
            Value::Object(obj) => obj.get("filename").and_then(Value::as_str).unwrap_or(""),
            _ => return Err(ExtractionFault::InvalidFileEntry { index }),
        };
        if is_core_file(filename) {
            core_count += 1;
        }
    }
    Ok(core_count)
}

fn is_core_file(filename: &str) -> bool {
    let lowered = filename.to_lowercase();
    CORE_FILE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Average changed lines per file, normalized to [0, 1]
fn estimate_complexity(files_changed: u64, additions: u64, deletions: u64) -> f64 {
    if files_changed == 0 {
        return 0.0;
    }
    let avg_changes = (additions as f64 + deletions as f64) / files_changed as f64;
    (avg_changes / COMPLEXITY_SATURATION).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn extract(pr: &Value) -> FeatureRecord {
        FeatureExtractor::new().extract_at(pr, fixed_now())
    }

    #[test]
    fn test_empty_payload_yields_defaults_except_author() {
        let record = extract(&json!({}));
        assert_eq!(record.files_changed, 0);
        assert_eq!(record.branch_age_days, 0);
        assert_eq!(record.modified_core_files, 0);
        assert!(record.avg_file_complexity.abs() < f64::EPSILON);
        // No author data at all scores zero experience.
        assert!(record.author_experience_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_object_payload_is_default_record() {
        assert_eq!(extract(&json!([1, 2, 3])), FeatureRecord::default());
        assert_eq!(extract(&json!("pr")), FeatureRecord::default());
        assert_eq!(extract(&Value::Null), FeatureRecord::default());
    }

    #[test]
    fn test_files_changed_camel_case_wins() {
        let record = extract(&json!({"filesChanged": 7, "files_changed": 3}));
        assert_eq!(record.files_changed, 7);

        let record = extract(&json!({"files_changed": 3}));
        assert_eq!(record.files_changed, 3);
    }

    #[test]
    fn test_null_field_is_treated_as_absent() {
        let record = extract(&json!({"filesChanged": null, "files_changed": 4}));
        assert_eq!(record.files_changed, 4);
    }

    #[test]
    fn test_passthrough_fields() {
        let record = extract(&json!({
            "base_branch_commits": 60,
            "overlapping_ratio": 0.6,
            "recent_conflicts": 2,
        }));
        assert_eq!(record.base_branch_commits_since_branch, 60);
        assert!((record.overlapping_files_ratio - 0.6).abs() < f64::EPSILON);
        assert_eq!(record.recent_conflicts_count, 2);
    }

    #[test]
    fn test_integral_float_counts_accepted() {
        let record = extract(&json!({"additions": 120.0}));
        assert_eq!(record.additions, 120);
    }

    #[test]
    fn test_invalid_number_falls_back_to_defaults() {
        assert_eq!(extract(&json!({"additions": "many"})), FeatureRecord::default());
        assert_eq!(extract(&json!({"deletions": -4})), FeatureRecord::default());
        assert_eq!(extract(&json!({"files_changed": 2.5})), FeatureRecord::default());
    }

    #[test]
    fn test_try_extract_reports_field() {
        let fault = FeatureExtractor::new()
            .try_extract(&json!({"additions": "many"}), fixed_now())
            .unwrap_err();
        assert_eq!(
            fault,
            ExtractionFault::InvalidNumber {
                field: "additions",
                value: "\"many\"".to_string(),
            }
        );
    }

    #[test]
    fn test_branch_age_rfc3339_zulu() {
        let record = extract(&json!({"created_at": "2025-06-05T12:00:00Z"}));
        assert_eq!(record.branch_age_days, 10);
    }

    #[test]
    fn test_branch_age_camel_case_and_offset() {
        let record = extract(&json!({"createdAt": "2025-06-12T14:00:00+02:00"}));
        assert_eq!(record.branch_age_days, 3);
    }

    #[test]
    fn test_branch_age_naive_timestamp_is_utc() {
        let record = extract(&json!({"created_at": "2025-06-01T12:00:00"}));
        assert_eq!(record.branch_age_days, 14);
    }

    #[test]
    fn test_branch_age_partial_day_truncates() {
        let record = extract(&json!({"created_at": "2025-06-14T13:00:00Z"}));
        assert_eq!(record.branch_age_days, 0);
    }

    #[test]
    fn test_branch_age_unparsable_or_future_is_zero() {
        assert_eq!(extract(&json!({"created_at": "last tuesday"})).branch_age_days, 0);
        assert_eq!(extract(&json!({"created_at": 12345})).branch_age_days, 0);
        assert_eq!(
            extract(&json!({"created_at": "2026-01-01T00:00:00Z"})).branch_age_days,
            0
        );
    }

    #[test]
    fn test_branch_age_empty_created_at_falls_through() {
        let record = extract(&json!({"created_at": "", "createdAt": "2025-06-10"}));
        assert_eq!(record.branch_age_days, 5);
    }

    #[test]
    fn test_author_experience_blend() {
        let record = extract(&json!({"author": {"contributions": 50, "account_age_years": 2.5}}));
        assert!((record.author_experience_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_author_experience_saturates() {
        let record = extract(&json!({"author": {"contributions": 1000, "account_age_years": 1}}));
        assert!((record.author_experience_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_author_not_object_is_fault() {
        assert_eq!(extract(&json!({"author": "octocat"})), FeatureRecord::default());
    }

    #[test]
    fn test_core_files_counted_once_per_file() {
        let record = extract(&json!({
            "files": [
                "src/core/config.rs",
                {"filename": "Dockerfile"},
                "README.md",
                "db/migration_001.sql",
                {"status": "modified"},
            ]
        }));
        assert_eq!(record.modified_core_files, 3);
    }

    #[test]
    fn test_core_files_case_insensitive() {
        assert!(is_core_file("PACKAGE.JSON"));
        assert!(is_core_file("web/Index.tsx"));
        assert!(!is_core_file("src/main.rs"));
    }

    #[test]
    fn test_core_files_non_array_is_zero() {
        assert_eq!(extract(&json!({"files": 12})).modified_core_files, 0);
    }

    #[test]
    fn test_core_files_bad_entry_is_fault() {
        let fault = FeatureExtractor::new()
            .try_extract(&json!({"files": ["a.rs", 7]}), fixed_now())
            .unwrap_err();
        assert_eq!(fault, ExtractionFault::InvalidFileEntry { index: 1 });
    }

    #[test]
    fn test_complexity_zero_files_is_zero() {
        let record = extract(&json!({"files_changed": 0, "additions": 500, "deletions": 20}));
        assert!(record.avg_file_complexity.abs() < f64::EPSILON);
    }

    #[test]
    fn test_complexity_normalized() {
        let record = extract(&json!({"files_changed": 4, "additions": 150, "deletions": 50}));
        assert!((record.avg_file_complexity - 0.5).abs() < 1e-12);

        let record = extract(&json!({"files_changed": 1, "additions": 900}));
        assert!((record.avg_file_complexity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_complexity_absent_file_count_divides_by_one() {
        let record = extract(&json!({"additions": 30, "deletions": 10}));
        assert_eq!(record.files_changed, 0);
        assert!((record.avg_file_complexity - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_ratio_clamped() {
        let record = extract(&json!({"overlapping_ratio": 3.0}));
        assert!((record.overlapping_files_ratio - 1.0).abs() < f64::EPSILON);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any subset of known fields extracts without leaving [0, 1] bounds
            #[test]
            fn prop_bounded_scores(
                files in proptest::option::of(0u64..500),
                additions in proptest::option::of(0u64..100_000),
                deletions in proptest::option::of(0u64..100_000),
                contributions in proptest::option::of(0u32..10_000),
                years in proptest::option::of(0u32..40),
            ) {
                let mut pr = Map::new();
                if let Some(f) = files { pr.insert("files_changed".into(), json!(f)); }
                if let Some(a) = additions { pr.insert("additions".into(), json!(a)); }
                if let Some(d) = deletions { pr.insert("deletions".into(), json!(d)); }
                if contributions.is_some() || years.is_some() {
                    let mut author = Map::new();
                    if let Some(c) = contributions { author.insert("contributions".into(), json!(c)); }
                    if let Some(y) = years { author.insert("account_age_years".into(), json!(y)); }
                    pr.insert("author".into(), Value::Object(author));
                }

                let record = extract(&Value::Object(pr));
                prop_assert!((0.0..=1.0).contains(&record.author_experience_score));
                prop_assert!((0.0..=1.0).contains(&record.avg_file_complexity));
                prop_assert_eq!(record.files_changed, files.unwrap_or(0));
            }
        }
    }
}
