// ============================================================
// Layer 4 - Categorical Encoder
// ============================================================
// Second cleaning step: derives integer columns from the three
// categorical text columns. Source columns are kept unchanged.
//
//   gender          → gender_encoded    Male=1, Female=0,
//                                       anything else = -1
//                                       (undefined, never 0)
//   smoking_history → smoking_encoded   never=0, No Info=1,
//                                       former/not current/ever=2,
//                                       current=3
//   location        → location_encoded  0, 1, 2, ... in order of
//                                       first appearance in this
//                                       batch; missing = -1
//
// Location codes are only meaningful within one batch. The
// mapping is returned so callers can log or persist it.
//
// An encoded column is only produced when its source column is
// present.

use std::collections::HashMap;

use crate::data::dataset::{CleanedDataset, RawDataset};
use crate::domain::column::Column;
use crate::domain::record::{gender_code, CleanedRecord, SmokingStatus};

/// Code given to genders other than Male/Female
pub const UNDEFINED_GENDER_CODE: i64 = -1;

/// Code given to rows whose location is missing
pub const MISSING_LOCATION_CODE: i64 = -1;

/// What the encoder produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodingSummary {
    /// Encoded columns added to the dataset
    pub encoded:           Vec<Column>,
    /// Rows whose gender could not be mapped
    pub undefined_genders: usize,
    /// Location labels, indexed by their code
    pub locations:         Vec<String>,
}

pub struct Encoder;

impl Encoder {
    pub fn new() -> Self {
        Self
    }

    /// Turn imputed raw rows into cleaned rows with encoded columns
    pub fn encode(&self, data: RawDataset) -> (CleanedDataset, EncodingSummary) {
        let mut summary = EncodingSummary::default();
        let mut columns = data.columns.clone();

        let has_gender   = columns.contains(Column::Gender);
        let has_smoking  = columns.contains(Column::SmokingHistory);
        let has_location = columns.contains(Column::Location);

        let mut location_codes: HashMap<String, i64> = HashMap::new();

        let records = data
            .records
            .into_iter()
            .map(|raw| {
                let mut row = CleanedRecord::from(raw);

                if has_gender {
                    let code = row.base.gender.as_deref().and_then(gender_code);
                    if code.is_none() {
                        summary.undefined_genders += 1;
                    }
                    row.gender_encoded = Some(code.unwrap_or(UNDEFINED_GENDER_CODE));
                }

                if has_smoking {
                    row.smoking_encoded = Some(
                        row.base
                            .smoking_history
                            .as_deref()
                            .map_or(SmokingStatus::NoInfo, SmokingStatus::from_label)
                            .ordinal(),
                    );
                }

                if has_location {
                    row.location_encoded = Some(match row.base.location.as_deref() {
                        Some(label) => {
                            let next = location_codes.len() as i64;
                            *location_codes.entry(label.to_string()).or_insert_with(|| {
                                summary.locations.push(label.to_string());
                                next
                            })
                        }
                        None => MISSING_LOCATION_CODE,
                    });
                }

                row
            })
            .collect();

        for (present, column) in [
            (has_gender, Column::GenderEncoded),
            (has_smoking, Column::SmokingEncoded),
            (has_location, Column::LocationEncoded),
        ] {
            if present {
                columns.insert(column);
                summary.encoded.push(column);
            } else {
                tracing::debug!("Source of '{}' absent; skipping", column);
            }
        }

        (CleanedDataset::new(columns, records), summary)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::ColumnSet;
    use crate::domain::record::RawRecord;

    fn row(gender: &str, smoking: &str, location: Option<&str>) -> RawRecord {
        RawRecord {
            gender:          Some(gender.to_string()),
            smoking_history: Some(smoking.to_string()),
            location:        location.map(str::to_string),
            ..Default::default()
        }
    }

    fn all_categoricals() -> ColumnSet {
        [Column::Gender, Column::SmokingHistory, Column::Location].into_iter().collect()
    }

    #[test]
    fn test_encodes_each_categorical() {
        let data = RawDataset::new(all_categoricals(), vec![
            row("Male", "current", Some("Ohio")),
            row("Female", "never", Some("Utah")),
            row("Female", "former", Some("Ohio")),
        ]);
        let (cleaned, summary) = Encoder::new().encode(data);

        let genders: Vec<_> = cleaned.records.iter().map(|r| r.gender_encoded).collect();
        let smoking: Vec<_> = cleaned.records.iter().map(|r| r.smoking_encoded).collect();
        let places:  Vec<_> = cleaned.records.iter().map(|r| r.location_encoded).collect();
        assert_eq!(genders, vec![Some(1), Some(0), Some(0)]);
        assert_eq!(smoking, vec![Some(3), Some(0), Some(2)]);
        assert_eq!(places,  vec![Some(0), Some(1), Some(0)]);
        assert_eq!(summary.locations, vec!["Ohio".to_string(), "Utah".to_string()]);
        assert!(cleaned.columns.contains(Column::LocationEncoded));
    }

    #[test]
    fn test_unmapped_gender_is_undefined_not_zero() {
        let data = RawDataset::new(all_categoricals(), vec![row("Other", "never", Some("Ohio"))]);
        let (cleaned, summary) = Encoder::new().encode(data);
        assert_eq!(cleaned.records[0].gender_encoded, Some(UNDEFINED_GENDER_CODE));
        assert_eq!(summary.undefined_genders, 1);
    }

    #[test]
    fn test_missing_location_gets_explicit_code() {
        let data = RawDataset::new(all_categoricals(), vec![row("Male", "never", None)]);
        let (cleaned, _) = Encoder::new().encode(data);
        assert_eq!(cleaned.records[0].location_encoded, Some(MISSING_LOCATION_CODE));
    }

    #[test]
    fn test_absent_source_column_skips_its_encoding() {
        let columns: ColumnSet = [Column::Gender].into_iter().collect();
        let data = RawDataset::new(columns, vec![row("Male", "never", Some("Ohio"))]);
        let (cleaned, summary) = Encoder::new().encode(data);

        assert_eq!(summary.encoded, vec![Column::GenderEncoded]);
        assert!(!cleaned.columns.contains(Column::SmokingEncoded));
        assert!(!cleaned.columns.contains(Column::LocationEncoded));
        assert_eq!(cleaned.records[0].smoking_encoded, None);
    }
}
