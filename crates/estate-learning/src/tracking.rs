//! Experiment tracking adapter.
//!
//! The training pipeline hands parameters and metrics to an
//! [`ExperimentTracker`] as plain key/value maps. The tracker assigns the run
//! identifier; the pipeline only passes it back and never interprets it.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryTracker`]: keeps runs in memory, for tests and embedding
//! - [`JsonFileTracker`]: appends one JSON line per event under a directory
//!
//! # Example
//!
//! ```rust,ignore
//! use estate_learning::{ExperimentTracker, JsonFileTracker};
//!
//! let tracker = JsonFileTracker::new("mlruns")?;
//! let run_id = tracker.start_run("house-prices")?;
//! tracker.log_metrics(&run_id, &report.metrics())?;
//! tracker.end_run(&run_id)?;
//! ```

use crate::error::{LearningError, Result};
use crate::types::{Metrics, Params};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Name of the event log written by [`JsonFileTracker`].
pub const RUNS_FILE: &str = "runs.jsonl";

/// Receives parameters and metrics of a training run.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can be
/// moved to a worker thread.
pub trait ExperimentTracker: Send + Sync {
    /// Open a run under `experiment` and return its identifier.
    fn start_run(&self, experiment: &str) -> Result<String>;

    /// Record parameters for an open run.
    fn log_params(&self, run_id: &str, params: &Params) -> Result<()>;

    /// Record metrics for an open run.
    fn log_metrics(&self, run_id: &str, metrics: &Metrics) -> Result<()>;

    /// Close a run. Further logging to it fails.
    fn end_run(&self, run_id: &str) -> Result<()>;
}

/// Run identifier from the current time plus a per-tracker sequence number.
fn next_run_id(counter: &AtomicU64) -> String {
    let seq = counter.fetch_add(1, Ordering::SeqCst);
    format!("{}-{:04}", Utc::now().format("%Y%m%dT%H%M%S%3f"), seq)
}

// ============================================================================
// In-memory tracker
// ============================================================================

/// A run as recorded by [`InMemoryTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment: String,
    pub params: Params,
    pub metrics: Metrics,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Keeps every run in memory.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    runs: Mutex<Vec<RunRecord>>,
    counter: AtomicU64,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all runs, in start order.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().clone()
    }

    /// Snapshot of one run.
    pub fn run(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.lock().iter().find(|r| r.run_id == run_id).cloned()
    }

    fn with_open_run<F>(&self, run_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut RunRecord),
    {
        let mut runs = self.runs.lock();
        let run = runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| LearningError::tracking(format!("Unknown run '{}'", run_id)))?;
        if run.is_finished() {
            return Err(LearningError::tracking(format!(
                "Run '{}' has already ended",
                run_id
            )));
        }
        f(run);
        Ok(())
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn start_run(&self, experiment: &str) -> Result<String> {
        let run_id = next_run_id(&self.counter);
        self.runs.lock().push(RunRecord {
            run_id: run_id.clone(),
            experiment: experiment.to_string(),
            params: Params::new(),
            metrics: Metrics::new(),
            started_at: Utc::now(),
            ended_at: None,
        });
        Ok(run_id)
    }

    fn log_params(&self, run_id: &str, params: &Params) -> Result<()> {
        self.with_open_run(run_id, |run| {
            run.params
                .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        })
    }

    fn log_metrics(&self, run_id: &str, metrics: &Metrics) -> Result<()> {
        self.with_open_run(run_id, |run| {
            run.metrics.extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        })
    }

    fn end_run(&self, run_id: &str) -> Result<()> {
        self.with_open_run(run_id, |run| run.ended_at = Some(Utc::now()))
    }
}

// ============================================================================
// JSON lines tracker
// ============================================================================

/// One line of the [`JsonFileTracker`] event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    RunStarted {
        run_id: String,
        experiment: String,
        timestamp: DateTime<Utc>,
    },
    Params {
        run_id: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
    Metrics {
        run_id: String,
        metrics: Metrics,
        timestamp: DateTime<Utc>,
    },
    RunEnded {
        run_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::Params { run_id, .. }
            | Self::Metrics { run_id, .. }
            | Self::RunEnded { run_id, .. } => run_id,
        }
    }
}

/// Appends tracker events as JSON lines to `<dir>/runs.jsonl`.
///
/// The file is only ever appended to.
#[derive(Debug)]
pub struct JsonFileTracker {
    dir: PathBuf,
    open_runs: Mutex<HashMap<String, String>>,
    counter: AtomicU64,
}

impl JsonFileTracker {
    /// Create a tracker writing under `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            LearningError::tracking(format!(
                "Cannot create tracking directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir,
            open_runs: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the event log.
    pub fn runs_file(&self) -> PathBuf {
        self.dir.join(RUNS_FILE)
    }

    /// Read back every event in the log, in write order.
    pub fn read_events(&self) -> Result<Vec<TrackerEvent>> {
        let path = self.runs_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|e| Self::io_error(&path, e))?;
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| Self::io_error(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line).map_err(|e| {
                LearningError::tracking(format!("Corrupt line in '{}': {}", path.display(), e))
            })?;
            events.push(event);
        }
        Ok(events)
    }

    fn append(&self, event: &TrackerEvent) -> Result<()> {
        let path = self.runs_file();
        let line = serde_json::to_string(event)
            .map_err(|e| LearningError::tracking(format!("Cannot encode event: {}", e)))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Self::io_error(&path, e))?;
        writeln!(file, "{}", line).map_err(|e| Self::io_error(&path, e))?;
        debug!("Tracker event for run {} appended", event.run_id());
        Ok(())
    }

    fn ensure_open(&self, run_id: &str) -> Result<()> {
        if self.open_runs.lock().contains_key(run_id) {
            Ok(())
        } else {
            Err(LearningError::tracking(format!(
                "Run '{}' is not open",
                run_id
            )))
        }
    }

    fn io_error(path: &Path, err: std::io::Error) -> LearningError {
        LearningError::tracking(format!("Cannot write '{}': {}", path.display(), err))
    }
}

impl ExperimentTracker for JsonFileTracker {
    fn start_run(&self, experiment: &str) -> Result<String> {
        let run_id = next_run_id(&self.counter);
        self.append(&TrackerEvent::RunStarted {
            run_id: run_id.clone(),
            experiment: experiment.to_string(),
            timestamp: Utc::now(),
        })?;
        self.open_runs
            .lock()
            .insert(run_id.clone(), experiment.to_string());
        Ok(run_id)
    }

    fn log_params(&self, run_id: &str, params: &Params) -> Result<()> {
        self.ensure_open(run_id)?;
        self.append(&TrackerEvent::Params {
            run_id: run_id.to_string(),
            params: params.clone(),
            timestamp: Utc::now(),
        })
    }

    fn log_metrics(&self, run_id: &str, metrics: &Metrics) -> Result<()> {
        self.ensure_open(run_id)?;
        self.append(&TrackerEvent::Metrics {
            run_id: run_id.to_string(),
            metrics: metrics.clone(),
            timestamp: Utc::now(),
        })
    }

    fn end_run(&self, run_id: &str) -> Result<()> {
        self.ensure_open(run_id)?;
        self.append(&TrackerEvent::RunEnded {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
        })?;
        self.open_runs.lock().remove(run_id);
        Ok(())
    }
}

// Ensure trackers can be shared with a pipeline on another thread
static_assertions::assert_impl_all!(InMemoryTracker: Send, Sync);
static_assertions::assert_impl_all!(JsonFileTracker: Send, Sync);
