// ============================================================
// Layer 4 - Standard Scaler
// ============================================================
// Third cleaning step: standardises the continuous columns
// (age, bmi, hbA1c_level, blood_glucose_level) to zero mean and
// unit variance:
//
//   z = (x - mean) / scale        scale = sqrt(population variance)
//
// A constant column has variance 0; its scale is taken as 1 so
// the transform stays finite and invertible.
//
// Parameters are fitted on the current batch only. They are
// saved as JSON beside the cleaned data so a later batch could
// be transformed consistently, but this pipeline always refits.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataset::CleanedDataset;
use crate::domain::column::Column;
use crate::domain::error::PipelineError;
use crate::domain::record::Row;

/// Fitted standardisation parameters, one entry per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// CSV header names of the scaled columns, in fit order
    pub columns:        Vec<String>,
    pub mean:           Vec<f64>,
    pub var:            Vec<f64>,
    pub scale:          Vec<f64>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit on the requested columns that are present in `data`.
    /// Missing cells are ignored.
    pub fn fit(data: &CleanedDataset, wanted: &[Column]) -> Result<Self> {
        if data.is_empty() {
            return Err(PipelineError::EmptyDataset("scaler input".into()).into());
        }

        let columns = data.columns.filter_present(wanted);
        let mut scaler = StandardScaler {
            columns:        columns.iter().map(|c| c.header().to_string()).collect(),
            mean:           Vec::with_capacity(columns.len()),
            var:            Vec::with_capacity(columns.len()),
            scale:          Vec::with_capacity(columns.len()),
            n_samples_seen: data.len(),
        };

        for column in columns {
            let values: Vec<f64> = data
                .records
                .iter()
                .filter_map(|r| r.get(column).as_f64())
                .collect();
            let n = values.len().max(1) as f64;

            let mean = values.iter().sum::<f64>() / n;
            let var  = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let scale = if var > 0.0 { var.sqrt() } else { 1.0 };

            scaler.mean.push(mean);
            scaler.var.push(var);
            scaler.scale.push(scale);
        }

        Ok(scaler)
    }

    /// Scaled columns resolved back to `Column`s
    pub fn fitted_columns(&self) -> Result<Vec<Column>> {
        self.columns
            .iter()
            .map(|name| {
                Column::from_header(name).ok_or_else(|| {
                    anyhow::Error::from(PipelineError::Schema(format!("unknown scaled column '{name}'")))
                })
            })
            .collect()
    }

    /// Standardise the fitted columns in place
    pub fn transform(&self, data: &mut CleanedDataset) -> Result<()> {
        self.map_columns(data, |x, mean, scale| (x - mean) / scale)
    }

    /// Undo `transform` in place
    #[allow(dead_code)]
    pub fn inverse_transform(&self, data: &mut CleanedDataset) -> Result<()> {
        self.map_columns(data, |z, mean, scale| z * scale + mean)
    }

    fn map_columns(&self, data: &mut CleanedDataset, f: impl Fn(f64, f64, f64) -> f64) -> Result<()> {
        let columns = self.fitted_columns()?;
        for record in &mut data.records {
            for (i, &column) in columns.iter().enumerate() {
                let slot = record
                    .base
                    .float_mut(column)
                    .with_context(|| format!("column '{column}' is not continuous"))?;
                if let Some(x) = slot.as_mut() {
                    *x = f(*x, self.mean[i], self.scale[i]);
                }
            }
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::ColumnSet;
    use crate::domain::record::{CleanedRecord, RawRecord};

    fn dataset(ages: &[f64], bmis: &[f64]) -> CleanedDataset {
        let columns: ColumnSet = [Column::Age, Column::Bmi].into_iter().collect();
        let records = ages
            .iter()
            .zip(bmis)
            .map(|(&age, &bmi)| {
                CleanedRecord::from(RawRecord { age: Some(age), bmi: Some(bmi), ..Default::default() })
            })
            .collect();
        CleanedDataset::new(columns, records)
    }

    #[test]
    fn test_fit_skips_absent_columns() {
        let data   = dataset(&[1.0, 2.0, 3.0], &[10.0, 10.0, 10.0]);
        let scaler = StandardScaler::fit(&data, &Column::SCALED).unwrap();
        assert_eq!(scaler.columns, vec!["age".to_string(), "bmi".to_string()]);
        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        // constant column: scale falls back to 1
        assert_eq!(scaler.scale[1], 1.0);
    }

    #[test]
    fn test_transform_gives_zero_mean_unit_variance() {
        let mut data = dataset(&[18.0, 35.0, 52.0, 80.0], &[19.5, 27.3, 31.0, 45.2]);
        let scaler   = StandardScaler::fit(&data, &Column::SCALED).unwrap();
        scaler.transform(&mut data).unwrap();

        let ages: Vec<f64> = data.records.iter().filter_map(|r| r.base.age).collect();
        let mean = ages.iter().sum::<f64>() / ages.len() as f64;
        let var  = ages.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / ages.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_transform_round_trips() {
        let original = dataset(&[18.0, 35.0, 52.0, 80.0], &[19.5, 27.3, 31.0, 45.2]);
        let mut data = original.clone();
        let scaler   = StandardScaler::fit(&data, &Column::SCALED).unwrap();
        scaler.transform(&mut data).unwrap();
        scaler.inverse_transform(&mut data).unwrap();

        for (a, b) in data.records.iter().zip(&original.records) {
            assert!((a.base.age.unwrap() - b.base.age.unwrap()).abs() < 1e-9);
            assert!((a.base.bmi.unwrap() - b.base.bmi.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let data = CleanedDataset::default();
        assert!(StandardScaler::fit(&data, &Column::SCALED).is_err());
    }
}
