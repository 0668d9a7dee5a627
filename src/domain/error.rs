// ============================================================
// Layer 3 - Pipeline Error Taxonomy
// ============================================================
// Failures that callers need to tell apart. Everything else is
// plain `anyhow` context. Stage code returns `anyhow::Result`
// and wraps one of these when the failure has a name; the
// orchestrator and tests recover it with `downcast_ref`.
//
// Absent optional columns are NOT an error (schema tolerance)
// and have no variant here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source blob missing, unreadable or truncated
    #[error("cannot retrieve '{bucket}/{key}': {reason}")]
    Retrieval {
        bucket: String,
        key:    String,
        reason: String,
    },

    /// Post-load verification found a different row count
    #[error("row count mismatch in '{table}': expected {expected}, found {actual}")]
    RowCountMismatch {
        table:    String,
        expected: usize,
        actual:   usize,
    },

    /// A column the stage cannot work without is absent
    #[error("required column '{0}' is missing from the input")]
    MissingColumn(String),

    /// Nothing to work on
    #[error("dataset '{0}' has no rows")]
    EmptyDataset(String),

    /// Input does not fit the expected shape
    #[error("schema error: {0}")]
    Schema(String),

    /// Uploading an artifact failed; callers treat this as non-fatal
    #[error("cannot publish '{key}': {reason}")]
    Publish {
        key:    String,
        reason: String,
    },
}

impl PipelineError {
    pub fn retrieval(bucket: &str, key: &str, reason: impl ToString) -> Self {
        PipelineError::Retrieval {
            bucket: bucket.to_string(),
            key:    key.to_string(),
            reason: reason.to_string(),
        }
    }
}
