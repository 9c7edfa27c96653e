//! Prediction benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use mergerisk::features::{FeatureExtractor, FeatureRecord};
use mergerisk::model::{train, TrainingConfig, TrainingSample};
use mergerisk::predictor::{heuristic_prediction, ConflictPredictor};
use serde_json::json;

fn sample_pr() -> serde_json::Value {
    json!({
        "number": 4821,
        "filesChanged": 14,
        "additions": 420,
        "deletions": 88,
        "created_at": "2025-06-01T09:30:00Z",
        "base_branch_commits": 35,
        "overlapping_ratio": 0.4,
        "recent_conflicts": 1,
        "author": {"contributions": 57, "account_age_years": 3},
        "files": [
            "src/core/engine.rs",
            {"filename": "config/settings.yaml"},
            "README.md",
            "migrations/0042_add_index.sql",
        ],
    })
}

fn benchmark_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::new();
    let pr = sample_pr();

    c.bench_function("extract_features", |b| {
        b.iter(|| extractor.extract(&pr));
    });
}

fn benchmark_heuristic(c: &mut Criterion) {
    let features = FeatureExtractor::new().extract(&sample_pr());

    c.bench_function("heuristic_prediction", |b| {
        b.iter(|| heuristic_prediction(&features));
    });
}

fn benchmark_model_prediction(c: &mut Criterion) {
    let samples: Vec<TrainingSample> = (0..200u64)
        .map(|i| {
            let conflict = i % 3 == 0;
            TrainingSample::new(
                FeatureRecord {
                    files_changed: if conflict { 20 + i % 15 } else { 1 + i % 8 },
                    additions: 10 * i,
                    overlapping_files_ratio: if conflict { 0.6 } else { 0.2 },
                    ..FeatureRecord::default()
                },
                conflict,
            )
        })
        .collect();
    let config = TrainingConfig {
        n_estimators: 50,
        max_depth: 4,
        min_samples_leaf: 2,
        ..TrainingConfig::default()
    };
    let artifact = match train(&samples, &config, "bench") {
        Ok(artifact) => artifact,
        Err(e) => panic!("training failed: {e}"),
    };
    let predictor = ConflictPredictor::from_artifact(artifact);
    let features = FeatureExtractor::new().extract(&sample_pr());

    c.bench_function("model_prediction", |b| {
        b.iter(|| predictor.predict(&features));
    });
}

criterion_group!(
    benches,
    benchmark_extraction,
    benchmark_heuristic,
    benchmark_model_prediction
);
criterion_main!(benches);
