// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The pipeline talks to three kinds of collaborators it does
// not own. Each one is a trait so the stages can be exercised
// against a local directory and an in-memory database in tests
// and against MinIO and a database file in production:
//
//   BlobStore        get/put bytes keyed by bucket + object key
//   RelationalStore  schema DDL, bulk insert, queries
//   Classifier       fit / predict, optionally feature importance
//
// All calls are synchronous; stages block until they return.

use anyhow::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::domain::record::Value;

// ─── BlobStore ────────────────────────────────────────────────────────────────
/// Object storage keyed by bucket and object name.
///
/// Implementations:
///   - LocalBlobStore → one sub-directory per bucket
///   - S3BlobStore    → S3-compatible HTTP endpoint (MinIO)
pub trait BlobStore {
    /// Fetch the whole object. A missing or truncated object is a
    /// `PipelineError::Retrieval`.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous object
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

// ─── RelationalStore ──────────────────────────────────────────────────────────
/// The minimum a destination database must offer the loader.
///
/// Implementations:
///   - SqliteStore   → file or in-memory SQLite database
///   - PostgresStore → PostgreSQL server (`postgres` feature)
pub trait RelationalStore {
    /// Run a schema statement (DROP / CREATE TABLE / CREATE INDEX)
    fn execute_ddl(&mut self, statement: &str) -> Result<()>;

    /// Insert `rows` into `columns` of `table`; returns rows written
    fn bulk_insert(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<usize>;

    /// Run a query and return (column names, rows)
    fn query(&mut self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)>;

    /// Number of rows currently in `table`
    fn count(&mut self, table: &str) -> Result<usize>;

    /// Column definition for an auto-generated integer primary key
    fn generated_key_ddl(&self) -> &'static str {
        "INTEGER PRIMARY KEY"
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A binary classifier over a dense feature matrix.
/// Labels are 0/1.
pub trait Classifier {
    /// Display name, also the key in the metrics document
    fn name(&self) -> &'static str;

    /// Fit on `x` (rows × features) and labels `y`
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<()>;

    /// Predict a label for every row of `x`
    fn predict(&self, x: ArrayView2<f64>) -> Array1<u8>;

    /// Per-feature importance, for models that have one
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}
