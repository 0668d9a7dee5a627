// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand per stage, plus `run` for the whole pipeline
// and `analyze` for the SQL report.
//
// Settings shared by several commands live in flattened arg
// groups (blob store, database, working directory). Values
// come from flags, then environment variables, then defaults.
//
// The `From` impls at the bottom are the boundary between
// Layer 1 and Layer 2: the application layer never sees clap
// types.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::config::{
    BlobConfig, DatabaseBackend, DatabaseConfig, PipelineConfig, PostgresConfig, RetryPolicy, TrainSettings,
    WorkPaths,
};
use crate::ml::model::CandidateConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the raw dataset from the blob store
    Extract(ExtractArgs),

    /// Impute, encode and scale the raw CSV
    Clean(CleanArgs),

    /// Load the cleaned CSV into the database (full refresh)
    Store(StoreArgs),

    /// Train the candidate models and keep the best one
    Train(TrainArgs),

    /// Run extract → clean → store → train with retries
    Run(RunArgs),

    /// Run the analytical SQL queries against the loaded table
    Analyze(AnalyzeArgs),

    /// Show the stage attempts recorded by `run`
    History(HistoryArgs),
}

// ─── Shared groups ────────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct BlobArgs {
    /// Blob store endpoint: host:port, http(s)://host:port, or file:///dir
    #[arg(long = "blob-endpoint", env = "MINIO_ENDPOINT", default_value = "minio:9000")]
    pub endpoint: String,

    #[arg(long, env = "MINIO_ACCESS_KEY", default_value = "minioadmin")]
    pub access_key: String,

    #[arg(long, env = "MINIO_SECRET_KEY", default_value = "minioadmin", hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "BUCKET_NAME", default_value = "diabetes-data")]
    pub bucket: String,

    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Object key of the raw CSV
    #[arg(long, default_value = "diabetes_raw.csv")]
    pub raw_object: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Sqlite,
    Postgres,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Relational store to load into
    #[arg(long = "db-backend", value_enum, env = "PIPELINE_DB_BACKEND", default_value = "sqlite")]
    pub backend: BackendArg,

    /// SQLite database file
    #[arg(long, env = "PIPELINE_DB_PATH", default_value = "diabetes.db")]
    pub db_path: PathBuf,

    #[arg(long = "pg-host", env = "POSTGRES_HOST", default_value = "postgres")]
    pub pg_host: String,

    #[arg(long = "pg-port", env = "POSTGRES_PORT", default_value_t = 5432)]
    pub pg_port: u16,

    #[arg(long = "pg-db", env = "POSTGRES_DB", default_value = "diabetes_db")]
    pub pg_db: String,

    #[arg(long = "pg-user", env = "POSTGRES_USER", default_value = "airflow")]
    pub pg_user: String,

    #[arg(long = "pg-password", env = "POSTGRES_PASSWORD", default_value = "airflow", hide_env_values = true)]
    pub pg_password: String,

    #[arg(long, default_value = "diabetes_clean")]
    pub table: String,

    /// Rows per insert transaction
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct WorkArgs {
    /// Directory for the raw/cleaned CSVs, scaler, model and metrics
    #[arg(long, env = "PIPELINE_WORK_DIR", default_value = "/tmp")]
    pub work_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the split and the random forest
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Keep the model and metrics local only
    #[arg(long)]
    pub no_publish: bool,
}

// ─── Per-command arguments ────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub blob: BlobArgs,

    #[command(flatten)]
    pub work: WorkArgs,

    /// Local file to write (default: {work_dir}/diabetes_raw.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub work: WorkArgs,

    /// Raw CSV (default: {work_dir}/diabetes_raw.csv)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Cleaned CSV (default: {work_dir}/diabetes_clean.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub work: WorkArgs,

    /// Cleaned CSV (default: {work_dir}/diabetes_clean.csv)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub blob: BlobArgs,

    #[command(flatten)]
    pub work: WorkArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Cleaned CSV (default: {work_dir}/diabetes_clean.csv)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub blob: BlobArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub work: WorkArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Extra attempts per stage after a failure
    #[arg(long, default_value_t = 1)]
    pub retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 300)]
    pub retry_delay_secs: u64,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// `;`-separated SQL file
    #[arg(long, default_value = "sql/analysis_queries.sql")]
    pub sql_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub work: WorkArgs,

    /// Only show attempts of this run id
    #[arg(long)]
    pub run_id: Option<String>,
}

// ─── Args → application config ────────────────────────────────────────────────
impl From<BlobArgs> for BlobConfig {
    fn from(a: BlobArgs) -> Self {
        BlobConfig {
            endpoint:   a.endpoint,
            access_key: a.access_key,
            secret_key: a.secret_key,
            bucket:     a.bucket,
            region:     a.region,
            raw_object: a.raw_object,
        }
    }
}

impl From<BackendArg> for DatabaseBackend {
    fn from(a: BackendArg) -> Self {
        match a {
            BackendArg::Sqlite   => DatabaseBackend::Sqlite,
            BackendArg::Postgres => DatabaseBackend::Postgres,
        }
    }
}

impl From<DatabaseArgs> for DatabaseConfig {
    fn from(a: DatabaseArgs) -> Self {
        DatabaseConfig {
            backend:    a.backend.into(),
            path:       a.db_path,
            postgres:   PostgresConfig {
                host:     a.pg_host,
                port:     a.pg_port,
                dbname:   a.pg_db,
                user:     a.pg_user,
                password: a.pg_password,
            },
            table:      a.table,
            batch_size: a.batch_size,
        }
    }
}

impl From<WorkArgs> for WorkPaths {
    fn from(a: WorkArgs) -> Self {
        WorkPaths::in_dir(a.work_dir)
    }
}

impl From<ModelArgs> for TrainSettings {
    fn from(a: ModelArgs) -> Self {
        TrainSettings {
            test_fraction: a.test_fraction,
            seed:          a.seed,
            publish:       !a.no_publish,
            candidates:    CandidateConfig {
                forest_trees:     a.trees,
                forest_max_depth: a.max_depth,
                seed:             a.seed,
                ..Default::default()
            },
        }
    }
}

impl From<RunArgs> for PipelineConfig {
    fn from(a: RunArgs) -> Self {
        PipelineConfig {
            blob:     a.blob.into(),
            database: a.database.into(),
            paths:    a.work.into(),
            train:    a.model.into(),
            retry:    RetryPolicy { retries: a.retries, delay_secs: a.retry_delay_secs },
        }
    }
}
