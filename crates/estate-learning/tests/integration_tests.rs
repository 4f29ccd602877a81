//! Integration tests for the training pipeline.
//!
//! These tests train on the housing sample end to end and check the tracked
//! run, the persisted model and the progress stream.

use estate_learning::{
    FittedModel, InMemoryTracker, JsonFileTracker, LearningError, Pipeline, PipelineStage,
    ProgressUpdate, TrackerEvent, TrainingConfig,
};
use estate_processing::{DataIngestor, PipelineConfig};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn housing_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/housing_sample.csv")
}

fn log_price_config() -> TrainingConfig {
    TrainingConfig::builder()
        .target_column("SalePrice")
        .experiment("ames-sample")
        .processing(
            PipelineConfig::builder()
                .log_transform(["SalePrice", "Gr Liv Area"])
                .z_threshold(3.0)
                .seed(42)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

// ============================================================================
// End-to-end training
// ============================================================================

#[test]
fn test_train_housing_sample() {
    let tracker = Arc::new(InMemoryTracker::new());
    let pipeline = Pipeline::builder()
        .config(log_price_config())
        .tracker(tracker.clone())
        .build()
        .unwrap();

    let result = pipeline.train_file(housing_path()).unwrap();

    // One extreme row removed, then an 80/20 split of the remaining 29
    assert_eq!(result.summary.rows_before, 30);
    assert_eq!(result.summary.train_rows, 23);
    assert_eq!(result.summary.test_rows, 6);
    assert_eq!(result.report.n_samples, 6);
    assert!(result.report.mse.is_finite());
    assert!(result.report.r2.is_finite());
    assert!(result.report.mse >= 0.0);

    let run_id = result.run_id.clone().expect("run should be tracked");
    let run = tracker.run(&run_id).unwrap();
    assert!(run.is_finished());
    assert_eq!(run.experiment, "ames-sample");
    assert_eq!(run.metrics["mse"], result.report.mse);
    assert_eq!(run.metrics["r2"], result.report.r2);
    assert_eq!(
        run.params["log_transform_columns"],
        serde_json::json!(["SalePrice", "Gr Liv Area"])
    );
    assert_eq!(run.params["target_column"], serde_json::json!("SalePrice"));
}

#[test]
fn test_model_ignores_target_and_encodes_categories() {
    let pipeline = Pipeline::builder()
        .config(log_price_config())
        .build()
        .unwrap();
    let result = pipeline.train_file(housing_path()).unwrap();
    let info = result.model.info();

    assert!(!info.source_columns.contains(&"SalePrice".to_string()));
    assert!(info.source_columns.contains(&"Lot Area".to_string()));
    assert!(info.feature_names.iter().any(|f| f.starts_with("Garage Type_")));
    assert_eq!(info.feature_names.len(), result.model.coefficients().len());
    assert_eq!(info.n_train_samples, 23);
    assert!(result.run_id.is_none());
}

#[test]
fn test_training_is_reproducible() {
    let run = || {
        Pipeline::builder()
            .config(log_price_config())
            .build()
            .unwrap()
            .train_file(housing_path())
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.report.n_samples, second.report.n_samples);
    assert!((first.report.mse - second.report.mse).abs() < 1e-9);
    assert!((first.report.r2 - second.report.r2).abs() < 1e-9);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_saved_model_predicts_like_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let result = Pipeline::builder()
        .config(log_price_config())
        .build()
        .unwrap()
        .train_file(housing_path())
        .unwrap();
    result.model.save(&path).unwrap();
    let restored = FittedModel::load(&path).unwrap();

    // Raw data still has nulls; the model fills them with training values
    let df = DataIngestor::new().load(housing_path()).unwrap();
    let before = result.model.predict(&df).unwrap();
    let after = restored.predict(&df).unwrap();
    assert_eq!(before.len(), 30);
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
    }
}

#[test]
fn test_json_file_tracker_records_run() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Arc::new(JsonFileTracker::new(dir.path()).unwrap());

    let result = Pipeline::builder()
        .config(log_price_config())
        .tracker(tracker.clone())
        .build()
        .unwrap()
        .train_file(housing_path())
        .unwrap();

    let events = tracker.read_events().unwrap();
    assert_eq!(events.len(), 4);
    let run_id = result.run_id.unwrap();
    assert!(events.iter().all(|e| e.run_id() == run_id));
    assert!(matches!(events[0], TrackerEvent::RunStarted { ref experiment, .. } if experiment == "ames-sample"));
    assert!(matches!(events[3], TrackerEvent::RunEnded { .. }));
    match &events[2] {
        TrackerEvent::Metrics { metrics, .. } => {
            assert_eq!(metrics.len(), 5);
            assert!(metrics.contains_key("mae"));
        }
        other => panic!("expected metrics event, got {:?}", other),
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_target_fails_without_tracking() {
    let tracker = Arc::new(InMemoryTracker::new());
    let config = TrainingConfig::builder()
        .target_column("Price")
        .build()
        .unwrap();
    let err = Pipeline::builder()
        .config(config)
        .tracker(tracker.clone())
        .build()
        .unwrap()
        .train_file(housing_path())
        .unwrap_err();

    assert!(matches!(err, LearningError::TrainingFailed(_)));
    assert!(tracker.runs().is_empty());
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Pipeline::builder()
        .build()
        .unwrap()
        .train_file("/no/such/housing.csv")
        .unwrap_err();
    assert!(err.is_config_error());
    assert!(matches!(err, LearningError::Processing(_)));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("training.json");
    let config = log_price_config();
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = TrainingConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
}

// ============================================================================
// Progress
// ============================================================================

#[test]
fn test_progress_covers_every_stage() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    Pipeline::builder()
        .config(log_price_config())
        .tracker(Arc::new(InMemoryTracker::new()))
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .train_file(housing_path())
        .unwrap();

    let updates = updates.lock().unwrap();
    let mut stages: Vec<PipelineStage> = updates.iter().map(|u| u.stage).collect();
    stages.dedup();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Ingesting,
            PipelineStage::MissingValues,
            PipelineStage::FeatureEngineering,
            PipelineStage::OutlierRemoval,
            PipelineStage::Splitting,
            PipelineStage::Training,
            PipelineStage::Evaluating,
            PipelineStage::Tracking,
            PipelineStage::Complete,
        ]
    );

    // Overall progress never goes backwards
    for pair in updates.windows(2) {
        assert!(pair[1].progress >= pair[0].progress - 1e-6);
    }
}
