// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Concrete implementations of the domain gateways plus the
// files a run leaves on disk:
//
//   blob_store.rs     - LocalBlobStore (directory per bucket) and
//                       `open_blob_store`, which picks an
//                       implementation from the configured endpoint
//
//   s3.rs             - S3BlobStore: MinIO / S3 over HTTP with
//                       Signature V4
//
//   sqlite_store.rs   - SqliteStore: the default relational gateway
//
//   postgres_store.rs - PostgresStore (`postgres` feature)
//
//   relational.rs     - `open_relational_store`, which picks one
//                       from the configured backend
//
//   artifacts.rs      - scaler, model and metrics JSON files
//
//   run_log.rs        - CSV history of stage attempts
//
// Stages only see the traits from domain/traits.rs, so tests
// swap MinIO for a temp directory and a database file for an
// in-memory one without touching stage code.

/// Local directory blob store and endpoint dispatch
pub mod blob_store;

/// S3-compatible blob store
pub mod s3;

/// SQLite relational store
pub mod sqlite_store;

/// PostgreSQL relational store
#[cfg(feature = "postgres")]
pub mod postgres_store;

/// Backend dispatch for the relational store
pub mod relational;

/// JSON artifacts on local disk
pub mod artifacts;

/// Stage attempt history
pub mod run_log;
