// ============================================================
// Layer 2 - Pipeline Configuration
// ============================================================
// Every setting a run needs, grouped by the collaborator it
// configures. The CLI fills these from flags and environment
// variables (see cli/commands.rs); tests build them directly,
// usually from `Default` plus a scratch directory.
//
// All structs are serde-serialisable so a run can log or save
// the exact configuration it used.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ml::model::CandidateConfig;

// ─── Blob store ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// `host:port`, `http(s)://host:port`, or `file:///dir` for a local store
    pub endpoint:   String,
    pub access_key: String,
    #[serde(skip_serializing, default)]
    pub secret_key: String,
    pub bucket:     String,
    pub region:     String,
    /// Key of the source CSV inside `bucket`
    pub raw_object: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            endpoint:   "minio:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket:     "diabetes-data".to_string(),
            region:     "us-east-1".to_string(),
            raw_object: "diabetes_raw.csv".to_string(),
        }
    }
}

// ─── Relational store ─────────────────────────────────────────────────────────
/// Which relational gateway a run writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// SQLite file at `DatabaseConfig::path`
    #[default]
    Sqlite,
    /// PostgreSQL server described by `DatabaseConfig::postgres`
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host:     String,
    pub port:     u16,
    pub dbname:   String,
    pub user:     String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host:     "postgres".to_string(),
            port:     5432,
            dbname:   "diabetes_db".to_string(),
            user:     "airflow".to_string(),
            password: "airflow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend:    DatabaseBackend,
    /// SQLite database file
    pub path:       PathBuf,
    pub postgres:   PostgresConfig,
    pub table:      String,
    /// Rows per insert transaction
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend:    DatabaseBackend::default(),
            path:       PathBuf::from("diabetes.db"),
            postgres:   PostgresConfig::default(),
            table:      "diabetes_clean".to_string(),
            batch_size: 1000,
        }
    }
}

// ─── Local files ──────────────────────────────────────────────────────────────
/// Where each stage reads and writes its local artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkPaths {
    pub raw_csv:   PathBuf,
    pub clean_csv: PathBuf,
    pub scaler:    PathBuf,
    pub model:     PathBuf,
    pub metrics:   PathBuf,
    /// Append-only history of stage attempts made by `run`
    pub run_log:   PathBuf,
}

impl WorkPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            raw_csv:   dir.join("diabetes_raw.csv"),
            clean_csv: dir.join("diabetes_clean.csv"),
            scaler:    dir.join("scaler.json"),
            model:     dir.join("best_model.json"),
            metrics:   dir.join("model_metrics.json"),
            run_log:   dir.join("pipeline_runs.csv"),
        }
    }
}

impl Default for WorkPaths {
    fn default() -> Self {
        Self::in_dir("/tmp")
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSettings {
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seeds both the split and the random forest
    pub seed:          u64,
    /// Upload the model and metrics to the blob store afterwards
    pub publish:       bool,
    pub candidates:    CandidateConfig,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed:          42,
            publish:       true,
            candidates:    CandidateConfig::default(),
        }
    }
}

impl TrainSettings {
    /// Candidate hyperparameters with the run seed applied
    pub fn seeded_candidates(&self) -> CandidateConfig {
        CandidateConfig { seed: self.seed, ..self.candidates.clone() }
    }
}

// ─── Orchestration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub retries:    u32,
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 1, delay_secs: 300 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub blob:     BlobConfig,
    pub database: DatabaseConfig,
    pub paths:    WorkPaths,
    pub train:    TrainSettings,
    pub retry:    RetryPolicy,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.blob.bucket, "diabetes-data");
        assert_eq!(cfg.database.table, "diabetes_clean");
        assert_eq!(cfg.database.batch_size, 1000);
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(cfg.database.postgres.port, 5432);
        assert_eq!(cfg.paths.clean_csv, PathBuf::from("/tmp/diabetes_clean.csv"));
        assert_eq!(cfg.train.test_fraction, 0.2);
        assert_eq!(cfg.retry.retries, 1);
        assert_eq!(cfg.retry.delay_secs, 300);
    }

    #[test]
    fn test_secret_is_not_serialised() {
        let json = serde_json::to_string(&BlobConfig::default()).unwrap();
        assert!(!json.contains("secret_key"));

        let json = serde_json::to_string(&DatabaseConfig::default()).unwrap();
        assert!(json.contains("\"backend\":\"sqlite\""));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_seed_flows_into_candidates() {
        let settings = TrainSettings { seed: 7, ..Default::default() };
        assert_eq!(settings.seeded_candidates().seed, 7);
    }
}
