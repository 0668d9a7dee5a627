// ============================================================
// Layer 2 - Pipeline Orchestrator
// ============================================================
// Runs the four stages in strict order as a finite-state
// machine. Each successful stage moves the machine one state
// forward; a stage that keeps failing moves it to Failed and
// nothing after it runs.
//
//   Pending ─extract→ Extracted ─clean→ Cleaned ─store→ Stored ─train→ Trained
//      │                  │                 │               │
//      └──────────────────┴──── failure ────┴───────────────┴──→ Failed(stage)
//
// A failing stage is retried `retry.retries` more times, with
// `retry.delay_secs` between attempts. Every attempt is
// appended to the run log when one is attached.
//
// Stages share nothing but the files named in `WorkPaths` and
// the destination table, so any single stage can also be run
// on its own from the CLI.

use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::application::clean_use_case::CleanUseCase;
use crate::application::config::PipelineConfig;
use crate::application::extract_use_case::ExtractUseCase;
use crate::application::store_use_case::StoreUseCase;
use crate::application::train_use_case::TrainUseCase;
use crate::domain::evaluation::MetricsDocument;
use crate::domain::traits::{BlobStore, RelationalStore};
use crate::infra::artifacts::ArtifactStore;
use crate::infra::run_log::{RunLog, StageAttempt};

// ─── Stages and states ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Clean,
    Store,
    Train,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Clean   => "clean",
            Stage::Store   => "store",
            Stage::Train   => "train",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Extracted,
    Cleaned,
    Stored,
    Trained,
    /// The stage that exhausted its attempts
    Failed(Stage),
}

impl PipelineState {
    /// The stage that runs from this state, if any
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            PipelineState::Pending   => Some(Stage::Extract),
            PipelineState::Extracted => Some(Stage::Clean),
            PipelineState::Cleaned   => Some(Stage::Store),
            PipelineState::Stored    => Some(Stage::Train),
            PipelineState::Trained | PipelineState::Failed(_) => None,
        }
    }

    /// State after `stage` finished, successfully or not
    pub fn after(self, stage: Stage, succeeded: bool) -> PipelineState {
        if !succeeded {
            return PipelineState::Failed(stage);
        }
        match stage {
            Stage::Extract => PipelineState::Extracted,
            Stage::Clean   => PipelineState::Cleaned,
            Stage::Store   => PipelineState::Stored,
            Stage::Train   => PipelineState::Trained,
        }
    }
}

/// What a stage hands back on success
#[derive(Debug)]
enum StageOutput {
    File(PathBuf),
    Rows(usize),
    Metrics(Box<MetricsDocument>),
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub run_id:      String,
    pub state:       PipelineState,
    pub rows_loaded: usize,
    pub metrics:     MetricsDocument,
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────
pub struct Pipeline {
    config:  PipelineConfig,
    blob:    Box<dyn BlobStore>,
    db:      Box<dyn RelationalStore>,
    run_log: Option<RunLog>,
    state:   PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, blob: Box<dyn BlobStore>, db: Box<dyn RelationalStore>) -> Self {
        Self { config, blob, db, run_log: None, state: PipelineState::Pending }
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the machine from Pending to Trained, or to Failed
    /// with the failing stage's error
    pub fn run(&mut self) -> Result<PipelineRun> {
        let run_id = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        tracing::info!("Starting pipeline run {}", run_id);
        self.state = PipelineState::Pending;

        let mut rows_loaded = 0;
        let mut metrics     = None;

        while let Some(stage) = self.state.next_stage() {
            match self.run_with_retries(&run_id, stage) {
                Ok(output) => {
                    self.state = self.state.after(stage, true);
                    match output {
                        StageOutput::File(path) => tracing::info!("Stage '{}' wrote '{}'", stage, path.display()),
                        StageOutput::Rows(n) => rows_loaded = n,
                        StageOutput::Metrics(doc) => metrics = Some(*doc),
                    }
                }
                Err(e) => {
                    self.state = self.state.after(stage, false);
                    tracing::error!("Stage '{}' failed: {:#}", stage, e);
                    return Err(e.context(format!("pipeline run {run_id} failed at stage '{stage}'")));
                }
            }
        }

        let metrics = metrics.context("pipeline finished without training metrics")?;
        tracing::info!("Pipeline run {} finished; best model: {}", run_id, metrics.best_model);
        Ok(PipelineRun { run_id, state: self.state, rows_loaded, metrics })
    }

    fn run_with_retries(&mut self, run_id: &str, stage: Stage) -> Result<StageOutput> {
        let attempts = self.config.retry.retries + 1;
        let delay    = Duration::from_secs(self.config.retry.delay_secs);

        let mut attempt = 1;
        loop {
            tracing::info!("Stage '{}': attempt {}/{}", stage, attempt, attempts);
            let started = Instant::now();
            let result  = self.run_stage(stage);
            self.record(run_id, stage, attempt, started.elapsed(), result.as_ref().err());

            match result {
                Ok(output) => return Ok(output),
                Err(e) if attempt < attempts => {
                    tracing::warn!("Stage '{}' attempt {} failed: {:#}; retrying in {:?}", stage, attempt, e, delay);
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn run_stage(&mut self, stage: Stage) -> Result<StageOutput> {
        let cfg   = &self.config;
        let paths = &cfg.paths;

        match stage {
            Stage::Extract => ExtractUseCase::new(self.blob.as_ref(), &cfg.blob)
                .execute(&paths.raw_csv)
                .map(StageOutput::File),
            Stage::Clean => CleanUseCase::new(ArtifactStore::new(paths))
                .execute(&paths.raw_csv, &paths.clean_csv)
                .map(StageOutput::File),
            Stage::Store => StoreUseCase::new(self.db.as_mut(), &cfg.database)
                .execute(&paths.clean_csv)
                .map(StageOutput::Rows),
            Stage::Train => TrainUseCase::new(&cfg.train, ArtifactStore::new(paths))
                .with_publisher(self.blob.as_ref(), &cfg.blob.bucket)
                .execute(&paths.clean_csv)
                .map(|doc| StageOutput::Metrics(Box::new(doc))),
        }
    }

    fn record(&self, run_id: &str, stage: Stage, attempt: u32, elapsed: Duration, error: Option<&anyhow::Error>) {
        let Some(log) = &self.run_log else {
            return;
        };
        let entry = StageAttempt {
            run_id:        run_id.to_string(),
            stage:         stage.name().to_string(),
            attempt,
            status:        if error.is_some() { "failed" } else { "ok" }.to_string(),
            duration_secs: elapsed.as_secs_f64(),
            detail:        error.map(|e| format!("{e:#}")).unwrap_or_default(),
        };
        if let Err(e) = log.append(&entry) {
            tracing::warn!("Cannot write to run log '{}': {:#}", log.path().display(), e);
        }
    }
}
