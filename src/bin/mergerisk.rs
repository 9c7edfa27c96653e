//! mergerisk CLI - Merge-conflict risk prediction for pull requests
//!
//! Serve predictions over HTTP, score a single PR from the shell, or train
//! and publish a model artifact.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mergerisk::api::{self, AppState, ConflictResponse};
use mergerisk::config::{ServiceConfig, DEFAULT_MODEL_DIR, DEFAULT_PORT};
use mergerisk::features::FeatureExtractor;
use mergerisk::model::{parse_samples, train, TrainingConfig};
use mergerisk::predictor::{ConflictPredictor, PredictorHandle};
use mergerisk::{Error, Result};
use tracing::info;

/// mergerisk - Merge-Conflict Risk Prediction
#[derive(Parser)]
#[command(name = "mergerisk")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the prediction HTTP server
    Serve {
        /// Interface to bind
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Directory holding the model artifact
        #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,
    },

    /// Predict a single pull request from a JSON file (stdin by default)
    Predict {
        /// Path to the PR JSON payload
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory holding the model artifact
        #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,
    },

    /// Train a classifier from labelled PRs and publish the artifact
    Train {
        /// JSON Lines file of `{"pr": {...}, "conflict": bool}`
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the artifact
        #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,

        /// Version tag for the new artifact
        #[arg(long, default_value = "1.0.0")]
        version: String,

        /// Boosting iterations
        #[arg(long, default_value = "100")]
        n_estimators: usize,

        /// Learning rate (shrinkage)
        #[arg(long, default_value = "0.1")]
        learning_rate: f32,

        /// Maximum tree depth
        #[arg(long, default_value = "5")]
        max_depth: u32,

        /// Fraction of samples held out for evaluation
        #[arg(long, default_value = "0.2")]
        holdout: f64,

        /// Random seed for the split and importance permutation
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            model_dir,
        } => {
            let cfg = ServiceConfig {
                host,
                port,
                model_dir,
            };
            serve(cfg).await
        }
        Commands::Predict { input, model_dir } => predict(input.as_deref(), &model_dir),
        Commands::Train {
            input,
            model_dir,
            version,
            n_estimators,
            learning_rate,
            max_depth,
            holdout,
            seed,
        } => {
            let config = TrainingConfig {
                n_estimators,
                learning_rate,
                max_depth,
                holdout_ratio: holdout,
                seed,
                ..TrainingConfig::default()
            };
            train_model(&input, &model_dir, &version, &config)
        }
    }
}

async fn serve(cfg: ServiceConfig) -> Result<()> {
    let addr = cfg.listen_addr()?;

    let predictor = PredictorHandle::new(ConflictPredictor::load(&cfg.model_dir));
    info!(
        version = predictor.current().version(),
        status = predictor.current().status().name(),
        "predictor ready"
    );

    let state = AppState::new(FeatureExtractor::new(), predictor, cfg.model_dir.clone());
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mergerisk listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn predict(input: Option<&Path>, model_dir: &Path) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let pr: serde_json::Value = serde_json::from_str(&raw)?;

    let predictor = ConflictPredictor::load(model_dir);
    let features = FeatureExtractor::new().extract(&pr);
    let response = ConflictResponse::new(predictor.predict(&features), predictor.version());

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn train_model(
    input: &Path,
    model_dir: &Path,
    version: &str,
    config: &TrainingConfig,
) -> Result<()> {
    let jsonl = std::fs::read_to_string(input)?;
    let samples = parse_samples(&jsonl, &FeatureExtractor::new())?;
    if samples.is_empty() {
        return Err(Error::Training(format!(
            "no samples in {}",
            input.display()
        )));
    }
    info!(samples = samples.len(), path = %input.display(), "loaded training data");

    let artifact = train(&samples, config, version)?;
    artifact.save(model_dir)?;

    if let Some(metrics) = &artifact.metrics {
        println!("Trained model {version}");
        println!("  Training samples:   {}", metrics.training_samples);
        println!("  Evaluation samples: {}", metrics.evaluation_samples);
        println!("  Accuracy:           {:.3}", metrics.accuracy);
        println!("  Precision:          {:.3}", metrics.precision);
        println!("  Recall:             {:.3}", metrics.recall);
        println!("  F1 score:           {:.3}", metrics.f1_score);
        println!("  AUC-ROC:            {:.3}", metrics.auc_roc);
    }
    println!("Artifact written to {}", model_dir.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mergerisk=debug"));
    let enable_color = std::io::IsTerminal::is_terminal(&std::io::stderr());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(enable_color)
        .with_writer(std::io::stderr)
        .init();
}
