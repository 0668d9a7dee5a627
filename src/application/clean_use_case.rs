// ============================================================
// Layer 2 - CleanUseCase (Stage 2)
// ============================================================
// Turns the raw CSV into the cleaned CSV. The steps run in a
// fixed order because each one assumes the previous has run:
//
//   Step 1: Read raw CSV                (Layer 4 - data)
//   Step 2: Impute missing values       (Layer 4 - data)
//   Step 3: Encode categoricals         (Layer 4 - data)
//   Step 4: Fit + apply the scaler      (Layer 4 - data)
//   Step 5: Save the scaler             (Layer 6 - infra)
//   Step 6: Write the cleaned CSV       (Layer 4 - data)
//
// Columns absent from the input skip their step instead of
// failing the stage; every present column is written out.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::data::encoder::{Encoder, UNDEFINED_GENDER_CODE};
use crate::data::imputer::Imputer;
use crate::data::loader::{read_csv, write_csv};
use crate::data::scaler::StandardScaler;
use crate::domain::column::Column;
use crate::domain::error::PipelineError;
use crate::domain::record::RawRecord;
use crate::infra::artifacts::ArtifactStore;

pub struct CleanUseCase {
    artifacts: ArtifactStore,
}

impl CleanUseCase {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Clean `input` into `output` and return the output path
    pub fn execute(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        // ── Step 1: Read the raw CSV ─────────────────────────────────────────
        let mut raw = read_csv::<RawRecord>(input)?;
        if raw.is_empty() {
            return Err(PipelineError::EmptyDataset(input.display().to_string()).into());
        }
        let (rows, cols) = raw.shape();
        tracing::info!("Loaded {} rows × {} columns from '{}'", rows, cols, input.display());
        tracing::info!("Missing values before cleaning: {}", raw.null_count());

        // ── Step 2: Impute ───────────────────────────────────────────────────
        let imputed = Imputer::new().apply(&mut raw);
        if let Some(mode) = imputed.smoking_mode {
            tracing::info!(
                "smoking_history: replaced {} sentinel values with mode '{}'",
                imputed.smoking_replaced,
                mode.label()
            );
        }
        for (column, fill, filled) in &imputed.text_fills {
            tracing::info!("{}: filled {} cells with mode '{}'", column, filled, fill);
        }
        for (column, median, filled) in &imputed.medians {
            tracing::info!("{}: filled {} cells with median {:.4}", column, filled, median);
        }

        // ── Step 3: Encode ───────────────────────────────────────────────────
        let (mut cleaned, encoded) = Encoder::new().encode(raw);
        tracing::info!(
            "Encoded {:?}; {} distinct locations",
            encoded.encoded.iter().map(|c| c.header()).collect::<Vec<_>>(),
            encoded.locations.len()
        );
        if encoded.undefined_genders > 0 {
            tracing::warn!(
                "{} rows have a gender other than Male/Female; gender_encoded set to {}",
                encoded.undefined_genders,
                UNDEFINED_GENDER_CODE
            );
        }

        // ── Step 4: Scale ────────────────────────────────────────────────────
        let scaler = StandardScaler::fit(&cleaned, &Column::SCALED)?;
        scaler.transform(&mut cleaned)?;
        tracing::info!("Standardised {:?}", scaler.columns);

        // ── Step 5: Save the scaler ──────────────────────────────────────────
        self.artifacts.save_scaler(&scaler)?;

        // ── Step 6: Write the cleaned CSV ────────────────────────────────────
        tracing::info!("Missing values after cleaning: {}", cleaned.null_count());
        tracing::info!(
            "Final columns: {:?}",
            cleaned.columns.iter().map(|c| c.header()).collect::<Vec<_>>()
        );
        write_csv(&cleaned, output)?;

        let (rows, cols) = cleaned.shape();
        tracing::info!("Wrote {} rows × {} columns to '{}'", rows, cols, output.display());
        Ok(output.to_path_buf())
    }
}
