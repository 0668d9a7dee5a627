// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// One use case per pipeline stage, plus the orchestrator that
// chains them and the SQL analysis runner.
//
// Rules for this layer:
//   - No learning algorithms here (Layer 5)
//   - No printing here (Layer 1)
//   - Storage only through the domain traits and infra types
//   - Only workflow coordination and logging
//
// Every stage takes explicit input/output paths so it can be
// run on its own or from `Pipeline`.

/// Settings for every stage and collaborator
pub mod config;

/// Stage 1: blob store → local raw CSV
pub mod extract_use_case;

/// Stage 2: raw CSV → cleaned CSV + scaler
pub mod clean_use_case;

/// Stage 3: cleaned CSV → relational table
pub mod store_use_case;

/// Stage 4: cleaned CSV → best model + metrics
pub mod train_use_case;

/// Stage sequencing, retries and run state
pub mod pipeline;

/// Analytical SQL over the loaded table
pub mod analysis_use_case;
