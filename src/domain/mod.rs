// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types and traits describing what the pipeline
// works on. No file I/O, no network, no SQL in here.
//
// Think of this layer as the "dictionary" of the system:
// it defines what things ARE, not how they work.

// Known columns, their kinds and destination names
pub mod column;

// Typed raw / cleaned rows and dynamically-typed cells
pub mod record;

// Named failures (retrieval, row-count mismatch, ...)
pub mod error;

// Blob store, relational store and classifier abstractions
pub mod traits;

// Per-candidate scores and the metrics document
pub mod evaluation;
