// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between a CSV file on disk and a dense feature
// matrix. The cleaning steps run in this order, and the order
// matters: encoding and scaling both assume imputation has
// already filled every gap.
//
//   raw CSV
//       │
//       ▼
//   loader::read_csv      → typed rows + present columns
//       │
//       ▼
//   Imputer               → sentinel → mode, numeric gaps → median
//       │
//       ▼
//   Encoder               → gender / smoking / location codes
//       │
//       ▼
//   StandardScaler        → age, bmi, hbA1c, glucose standardised
//       │
//       ▼
//   loader::write_csv     → cleaned CSV
//       │
//       ▼
//   FeatureMatrix         → dense x / y for the trainer
//       │
//       ▼
//   stratified_split      → seeded 80/20 train/test indices
//
// Each module is responsible for exactly one step.

/// Typed rows plus the set of present columns
pub mod dataset;

/// CSV reading and writing
pub mod loader;

/// Missing-value policy
pub mod imputer;

/// Categorical encodings
pub mod encoder;

/// Standardisation of continuous columns
pub mod scaler;

/// Dense feature matrix for training
pub mod features;

/// Seeded, stratified train/test split
pub mod splitter;
