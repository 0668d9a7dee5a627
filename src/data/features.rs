// ============================================================
// Layer 4 - Feature Matrix
// ============================================================
// Turns cleaned rows into the dense matrix the classifiers see.
//
// The feature list is fixed, but only the columns actually
// present in the batch are used (same schema tolerance as the
// cleaner): a batch without `race:Asian` simply trains on one
// feature fewer.
//
// The `diabetes` label is required and must be 0 or 1. Rows
// with any missing feature or label (possible only when the
// cleaned file did not come from the cleaner) cannot be fed to
// a model and are dropped.

use anyhow::Result;
use ndarray::{Array1, Array2};

use crate::data::dataset::CleanedDataset;
use crate::domain::column::Column;
use crate::domain::error::PipelineError;
use crate::domain::record::Row;

/// Candidate feature columns, in matrix column order
pub const FEATURE_COLUMNS: [Column; 13] = [
    Column::Age,
    Column::Bmi,
    Column::HbA1cLevel,
    Column::BloodGlucoseLevel,
    Column::Hypertension,
    Column::HeartDisease,
    Column::GenderEncoded,
    Column::SmokingEncoded,
    Column::RaceAfricanAmerican,
    Column::RaceAsian,
    Column::RaceCaucasian,
    Column::RaceHispanic,
    Column::RaceOther,
];

/// Dense features and labels ready for training
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Header names of the matrix columns
    pub names:   Vec<String>,
    /// rows × features
    pub x:       Array2<f64>,
    /// 0/1 label per row
    pub y:       Array1<u8>,
    /// Rows skipped because of a missing value
    pub dropped: usize,
}

impl FeatureMatrix {
    /// Build the matrix from the present feature columns
    pub fn from_dataset(data: &CleanedDataset) -> Result<Self> {
        if !data.columns.contains(Column::Diabetes) {
            return Err(PipelineError::MissingColumn(Column::Diabetes.header().into()).into());
        }

        let features = data.columns.filter_present(&FEATURE_COLUMNS);
        if features.is_empty() {
            return Err(PipelineError::Schema("no feature columns present".into()).into());
        }
        for skipped in FEATURE_COLUMNS.iter().filter(|c| !features.contains(c)) {
            tracing::info!("Feature '{}' not in input; training without it", skipped);
        }

        let mut values  = Vec::with_capacity(data.len() * features.len());
        let mut labels  = Vec::with_capacity(data.len());
        let mut dropped = 0usize;

        for record in &data.records {
            let label = match record.base.diabetes {
                Some(0) => 0u8,
                Some(1) => 1u8,
                Some(other) => {
                    return Err(PipelineError::Schema(format!("label 'diabetes' must be 0 or 1, found {other}")).into());
                }
                None => {
                    dropped += 1;
                    continue;
                }
            };

            let row: Option<Vec<f64>> = features.iter().map(|c| record.get(*c).as_f64()).collect();
            match row {
                Some(row) => {
                    values.extend(row);
                    labels.push(label);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::warn!("Dropped {} rows with missing feature or label values", dropped);
        }
        if labels.is_empty() {
            return Err(PipelineError::EmptyDataset("feature matrix".into()).into());
        }

        let x = Array2::from_shape_vec((labels.len(), features.len()), values)?;
        Ok(Self {
            names: features.iter().map(|c| c.header().to_string()).collect(),
            x,
            y: Array1::from(labels),
            dropped,
        })
    }

    /// Count of rows per label, for logging the class balance
    pub fn label_counts(&self) -> [usize; 2] {
        let positives = self.y.iter().filter(|&&l| l == 1).count();
        [self.y.len() - positives, positives]
    }
}
