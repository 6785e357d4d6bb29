//! Superfund forest trainer CLI
//!
//! Offline trainer that writes the model and recipe artifact pair.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use superfund_ai_core::ArtifactPaths;
use superfund_ai_trainer::{train_from_csv, ForestConfig, TrainingParams};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "superfund-train")]
#[command(author = "Superfund Advisor Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Seeded random forest trainer for the Superfund advisor", long_about = None)]
struct Args {
    /// Input CSV dataset path (header row required)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the model and recipe files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Target column to predict
    #[arg(long, default_value = "5yr_Return")]
    target: String,

    /// Fraction of rows held out for validation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Random seed for the split and the forest
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of trees
    #[arg(long, default_value = "200")]
    trees: usize,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Model file name inside the output directory
    #[arg(long, default_value = "investment_model.json")]
    model_file: String,

    /// Recipe file name inside the output directory
    #[arg(long, default_value = "preprocessor_pipeline.json")]
    recipe_file: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Superfund forest trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading dataset from: {}", args.input.display());

    let params = TrainingParams {
        target_column: args.target,
        test_size: args.test_size,
        seed: args.seed,
        forest: ForestConfig {
            n_estimators: args.trees,
            max_depth: args.max_depth,
            ..ForestConfig::default()
        },
    };

    let outcome = train_from_csv(&args.input, &params).context("Training failed")?;

    std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;
    let paths = ArtifactPaths::new(
        args.output.join(&args.model_file),
        args.output.join(&args.recipe_file),
    );
    let hash = outcome
        .bundle
        .save(&paths)
        .context("Failed to write model artifacts")?;

    info!("Training completed successfully");
    info!("  Train MAE: {:.4}", outcome.report.train_mae);
    info!("  Validation MAE: {:.4}", outcome.report.validation_mae);
    info!("  Model: {} ({})", paths.model_path.display(), hash);
    info!("  Recipe: {}", paths.recipe_path.display());

    Ok(())
}
