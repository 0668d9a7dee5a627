// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// Each subcommand builds its collaborators (blob store,
// database) from the parsed settings and hands off to Layer 2.
// This is the only layer that prints to stdout.
//
//   extract   blob store → {work_dir}/diabetes_raw.csv
//   clean     raw CSV → cleaned CSV + scaler.json
//   store     cleaned CSV → database table
//   train     cleaned CSV → best_model.json + model_metrics.json
//   run       all four stages with retries
//   analyze   analytical SQL over the table
//   history   stage attempts recorded by `run`

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{AnalyzeArgs, CleanArgs, Commands, ExtractArgs, HistoryArgs, RunArgs, StoreArgs, TrainArgs};

use crate::application::config::{BlobConfig, DatabaseConfig, PipelineConfig, TrainSettings, WorkPaths};
use crate::infra::artifacts::ArtifactStore;
use crate::infra::blob_store::open_blob_store;
use crate::infra::run_log::RunLog;
use crate::infra::relational::open_relational_store;

#[derive(Parser, Debug)]
#[command(
    name = "diabetes-pipeline",
    version,
    about = "Batch pipeline: extract, clean, store and train on the diabetes dataset."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the selected command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Extract(args) => run_extract(args),
            Commands::Clean(args)   => run_clean(args),
            Commands::Store(args)   => run_store(args),
            Commands::Train(args)   => run_train(args),
            Commands::Run(args)     => run_pipeline(args),
            Commands::Analyze(args) => run_analyze(args),
            Commands::History(args) => run_history(args),
        }
    }
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    use crate::application::extract_use_case::ExtractUseCase;

    let blob: BlobConfig  = args.blob.into();
    let paths: WorkPaths  = args.work.into();
    let output            = args.output.unwrap_or(paths.raw_csv);

    let store = open_blob_store(&blob)?;
    let path  = ExtractUseCase::new(store.as_ref(), &blob).execute(&output)?;

    println!("Extracted raw data to {}", path.display());
    Ok(())
}

fn run_clean(args: CleanArgs) -> Result<()> {
    use crate::application::clean_use_case::CleanUseCase;

    let paths: WorkPaths = args.work.into();
    let input            = args.input.unwrap_or_else(|| paths.raw_csv.clone());
    let output           = args.output.unwrap_or_else(|| paths.clean_csv.clone());

    let path = CleanUseCase::new(ArtifactStore::new(&paths)).execute(&input, &output)?;

    println!("Cleaned data written to {}", path.display());
    Ok(())
}

fn run_store(args: StoreArgs) -> Result<()> {
    use crate::application::store_use_case::StoreUseCase;

    let database: DatabaseConfig = args.database.into();
    let paths: WorkPaths         = args.work.into();
    let input                    = args.input.unwrap_or(paths.clean_csv);

    let mut db = open_relational_store(&database)?;
    let rows   = StoreUseCase::new(db.as_mut(), &database).execute(&input)?;

    println!("Loaded {} rows into {}", rows, database.table);
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let blob: BlobConfig        = args.blob.into();
    let paths: WorkPaths        = args.work.into();
    let settings: TrainSettings = args.model.into();
    let input                   = args.input.unwrap_or_else(|| paths.clean_csv.clone());

    let store   = open_blob_store(&blob)?;
    let metrics = TrainUseCase::new(&settings, ArtifactStore::new(&paths))
        .with_publisher(store.as_ref(), &blob.bucket)
        .execute(&input)?;

    let best = &metrics.results[&metrics.best_model];
    println!(
        "Best model: {} (accuracy {:.4}, weighted F1 {:.4})",
        metrics.best_model, best.accuracy, best.f1_score
    );
    Ok(())
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    use crate::application::pipeline::Pipeline;

    let config: PipelineConfig = args.into();
    let blob    = open_blob_store(&config.blob)?;
    let db      = open_relational_store(&config.database)?;
    let run_log = RunLog::open(&config.paths.run_log)?;

    let mut pipeline = Pipeline::new(config, blob, db).with_run_log(run_log);
    let run = pipeline
        .run()
        .with_context(|| format!("Pipeline stopped in state {:?}", pipeline.state()))?;

    println!(
        "Run {} finished ({:?}): {} rows loaded, best model {}",
        run.run_id, run.state, run.rows_loaded, run.metrics.best_model
    );
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    use crate::application::analysis_use_case::{render_table, AnalysisUseCase};

    let database: DatabaseConfig = args.database.into();
    let mut db = open_relational_store(&database)?;

    let outcomes = AnalysisUseCase::new(db.as_mut()).execute_file(&args.sql_file)?;
    for (i, outcome) in outcomes.iter().enumerate() {
        println!("\n=== Query {} ===\n{}\n", i + 1, outcome.sql);
        match &outcome.result {
            Ok((columns, rows)) => println!("{}", render_table(columns, rows)),
            Err(message) => println!("ERROR: {message}"),
        }
    }
    Ok(())
}

fn run_history(args: HistoryArgs) -> Result<()> {
    let paths: WorkPaths = args.work.into();
    let log = RunLog::open(&paths.run_log)?;

    let attempts: Vec<_> = log
        .read_all()?
        .into_iter()
        .filter(|a| args.run_id.as_ref().map_or(true, |id| &a.run_id == id))
        .collect();
    let failed = attempts.iter().filter(|a| !a.succeeded()).count();

    for a in &attempts {
        println!(
            "{}  {:<8} attempt {}  {:<6} {:>8.3}s  {}",
            a.run_id, a.stage, a.attempt, a.status, a.duration_secs, a.detail
        );
    }
    println!("{} attempts ({} failed) in {}", attempts.len(), failed, log.path().display());

    if let Ok(metrics) = ArtifactStore::new(&paths).load_metrics() {
        println!("Latest model: {} (from {})", metrics.best_model, paths.metrics.display());
    }
    Ok(())
}
