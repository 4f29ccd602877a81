//! CLI entry point for the house-price training pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use estate_learning::{
    ExperimentTracker, InMemoryTracker, JsonFileTracker, Pipeline, TrainingConfig, TrainingResult,
};
use estate_processing::{MissingStrategy, OutlierPolicy, PipelineConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// CLI-compatible numeric imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericImputation {
    /// Use the mean of non-null values
    Mean,
    /// Use the median of non-null values
    Median,
    /// Use the most frequent value
    Mode,
    /// Use zero as the fill value
    Zero,
    /// Drop rows with missing values
    Drop,
}

impl From<CliNumericImputation> for MissingStrategy {
    fn from(cli: CliNumericImputation) -> Self {
        match cli {
            CliNumericImputation::Mean => MissingStrategy::Mean,
            CliNumericImputation::Median => MissingStrategy::Median,
            CliNumericImputation::Mode => MissingStrategy::Mode,
            CliNumericImputation::Zero => MissingStrategy::Constant("0".to_string()),
            CliNumericImputation::Drop => MissingStrategy::DropRows,
        }
    }
}

/// CLI-compatible categorical imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCategoricalImputation {
    /// Use the most frequent value (mode)
    Mode,
    /// Use a constant value ("Unknown")
    Constant,
    /// Drop rows with missing values
    Drop,
}

impl From<CliCategoricalImputation> for MissingStrategy {
    fn from(cli: CliCategoricalImputation) -> Self {
        match cli {
            CliCategoricalImputation::Mode => MissingStrategy::Mode,
            CliCategoricalImputation::Constant => MissingStrategy::Constant("Unknown".to_string()),
            CliCategoricalImputation::Drop => MissingStrategy::DropRows,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "House-price training pipeline",
    long_about = "Cleans a housing dataset, removes outliers, fits a linear regression \
                  and reports MSE and R² on a held-out split.\n\n\
                  EXAMPLES:\n  \
                  # Train with defaults (target SalePrice)\n  \
                  estate -i data/ames.csv\n\n  \
                  # Log-transform skewed columns and track the run\n  \
                  estate -i data/ames.csv --log-columns SalePrice,\"Gr Liv Area\" --tracking-dir mlruns\n\n  \
                  # Machine-readable output\n  \
                  estate -i data/ames.csv --json | jq .metrics.r2"
)]
struct Args {
    /// Path to the dataset (CSV or Parquet)
    #[arg(short, long)]
    input: PathBuf,

    /// Target column to predict
    #[arg(short, long)]
    target: Option<String>,

    /// Comma-separated columns to log-transform (log1p)
    #[arg(long, value_delimiter = ',')]
    log_columns: Vec<String>,

    /// Z-score threshold for outlier removal
    #[arg(long)]
    z_threshold: Option<f64>,

    /// Disable outlier removal
    #[arg(long, conflicts_with = "z_threshold")]
    no_outlier_removal: bool,

    /// Fraction of rows used for training, in (0, 1)
    #[arg(long)]
    train_ratio: Option<f64>,

    /// Seed for the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Strategy for imputing missing numeric values
    #[arg(long, value_enum)]
    numeric_imputation: Option<CliNumericImputation>,

    /// Strategy for imputing missing categorical values
    #[arg(long, value_enum)]
    categorical_imputation: Option<CliCategoricalImputation>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the JSON-lines experiment log
    ///
    /// Without it, the run is tracked in memory and only printed.
    #[arg(long)]
    tracking_dir: Option<PathBuf>,

    /// Experiment name for the tracker
    #[arg(long)]
    experiment: Option<String>,

    /// Write the fitted model to this JSON file
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// JSON document printed with `--json`.
#[derive(Serialize)]
struct CliReport<'a> {
    input: String,
    target_column: &'a str,
    run_id: Option<&'a str>,
    metrics: estate_learning::Metrics,
    params: estate_learning::Params,
    summary: &'a estate_processing::ProcessingSummary,
    model_path: Option<String>,
    duration_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;
    let tracker: Arc<dyn ExperimentTracker> = match &args.tracking_dir {
        Some(dir) => Arc::new(JsonFileTracker::new(dir)?),
        None => Arc::new(InMemoryTracker::new()),
    };

    let mut builder = Pipeline::builder().config(config).tracker(tracker);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    let result = pipeline.train_file(&args.input).map_err(|e| {
        error!("Training failed: {}", e);
        anyhow!("Training failed [{}]: {}", e.error_code(), e)
    })?;

    if let Some(path) = &args.model_out {
        result
            .model
            .save(path)
            .with_context(|| format!("Failed to save model to {}", path.display()))?;
    }

    if args.json {
        let report = CliReport {
            input: args.input.display().to_string(),
            target_column: result.model.target_column(),
            run_id: result.run_id.as_deref(),
            metrics: result.report.metrics(),
            params: result.model.params(),
            summary: &result.summary,
            model_path: args.model_out.as_ref().map(|p| p.display().to_string()),
            duration_ms: result.duration_ms,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&result, &args);
    Ok(())
}

/// Merge the optional config file with command-line overrides.
fn build_config(args: &Args) -> Result<TrainingConfig> {
    let base = match &args.config {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig::default(),
    };
    let mut processing: PipelineConfig = base.processing;

    if !args.log_columns.is_empty() {
        processing.log_transform_columns = args.log_columns.clone();
    }
    if let Some(strategy) = args.numeric_imputation {
        processing.missing_values.numeric_default = strategy.into();
    }
    if let Some(strategy) = args.categorical_imputation {
        processing.missing_values.categorical_default = strategy.into();
    }
    if args.no_outlier_removal {
        processing.outliers = None;
    } else if let Some(threshold) = args.z_threshold {
        let columns = processing
            .outliers
            .take()
            .map(|p| p.columns)
            .unwrap_or_default();
        processing.outliers = Some(OutlierPolicy::z_score(threshold, columns));
    }
    if let Some(ratio) = args.train_ratio {
        processing.split.train_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        processing.split.seed = seed;
    }

    let config = TrainingConfig::builder()
        .target_column(args.target.clone().unwrap_or(base.target_column))
        .experiment(args.experiment.clone().unwrap_or(base.experiment))
        .processing(processing)
        .build()?;
    Ok(config)
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` on purpose: this is the primary output of the CLI and
/// must be visible regardless of log level settings.
fn print_human_readable_summary(result: &TrainingResult, args: &Args) {
    let summary = &result.summary;
    let report = &result.report;

    println!();
    println!("{}", "=".repeat(80));
    println!("TRAINING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input.display(),
        summary.rows_before,
        summary.columns_before
    );
    println!("Target: {}", result.model.target_column());
    println!();

    println!("Preparation:");
    for step in &summary.steps {
        println!(
            "  - {:<26} {:>6} -> {:<6} rows  {}",
            step.kind.display_name(),
            step.rows_before,
            step.rows_after,
            step.description
        );
    }
    println!(
        "  Train/test: {} / {} rows",
        summary.train_rows, summary.test_rows
    );
    println!();

    println!("Model:");
    println!("  Features:  {}", result.model.coefficients().len());
    println!("  Intercept: {:.6}", result.model.intercept());
    let ignored = result.model.preprocessor().ignored_columns();
    if !ignored.is_empty() {
        println!("  Ignored:   {}", ignored.join(", "));
    }
    println!();

    println!("Evaluation ({} rows):", report.n_samples);
    println!("  MSE:  {:.6}", report.mse);
    println!("  RMSE: {:.6}", report.rmse);
    println!("  MAE:  {:.6}", report.mae);
    println!("  R²:   {:.4}", report.r2);
    println!();

    match (&result.run_id, &args.tracking_dir) {
        (Some(run_id), Some(dir)) => println!("Run {} logged to {}", run_id, dir.display()),
        (Some(run_id), None) => println!("Run {} (not persisted, use --tracking-dir)", run_id),
        _ => {}
    }
    if let Some(path) = &args.model_out {
        println!("Model written to {}", path.display());
    }
    println!("Duration: {}ms", result.duration_ms);
    println!("{}", "=".repeat(80));
}
