// ============================================================
// Layer 4 - Missing-Value Imputer
// ============================================================
// First cleaning step. Must run before encoding and scaling,
// which both assume every value is filled in.
//
// Policy:
//   smoking_history  The sentinel "No Info" (and anything we do
//                    not recognise, including empty cells) is
//                    replaced by the most frequent KNOWN value.
//                    The replacement therefore always occurs
//                    elsewhere in the batch; no new category is
//                    ever introduced.
//   gender,          Empty cells get the most frequent label in
//   location         the column (ties: alphabetically first), or
//                    "Unknown" when the column has no labels.
//   numeric columns  Missing entries are replaced by the column
//                    median. Integer columns get the rounded
//                    median so they stay integers.
//
// Columns absent from the batch are skipped.

use std::collections::BTreeMap;

use crate::data::dataset::RawDataset;
use crate::domain::column::{Column, ColumnKind};
use crate::domain::record::{Row, SmokingStatus, Value};

/// Categorical text columns filled with their mode
const TEXT_COLUMNS: [Column; 2] = [Column::Gender, Column::Location];

/// Fill for a text column that has no labels at all
pub const UNKNOWN_LABEL: &str = "Unknown";

/// What the imputer changed, for logging and tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationSummary {
    /// Mode used for smoking_history, if the column was present
    pub smoking_mode:     Option<SmokingStatus>,
    /// Rows whose smoking_history was replaced
    pub smoking_replaced: usize,
    /// (column, fill label, cells filled) for every text column that had gaps
    pub text_fills:       Vec<(Column, String, usize)>,
    /// (column, median, cells filled) for every numeric column that had gaps
    pub medians:          Vec<(Column, f64, usize)>,
}

pub struct Imputer;

impl Imputer {
    pub fn new() -> Self {
        Self
    }

    /// Fill every gap the policy covers, in place
    pub fn apply(&self, data: &mut RawDataset) -> ImputationSummary {
        let mut summary = ImputationSummary::default();

        // ── smoking_history: sentinel → mode of known values ─────────────────
        if data.columns.contains(Column::SmokingHistory) {
            let mode = smoking_mode(data);
            let replacement = mode.unwrap_or(SmokingStatus::NoInfo);
            if mode.is_none() {
                tracing::warn!("smoking_history has no known values; leaving the sentinel in place");
            }

            for record in &mut data.records {
                let known = record
                    .smoking_history
                    .as_deref()
                    .map(SmokingStatus::from_label)
                    .is_some_and(SmokingStatus::is_known);
                if !known {
                    record.smoking_history = Some(replacement.label().to_string());
                    summary.smoking_replaced += 1;
                }
            }
            summary.smoking_mode = mode;
        }

        // ── gender, location: gaps → mode ────────────────────────────────────
        for column in data.columns.filter_present(&TEXT_COLUMNS) {
            let missing = data.null_count_in(column);
            if missing == 0 {
                continue;
            }

            let fill = text_mode(data, column).unwrap_or_else(|| {
                tracing::warn!("Column '{}' has no values at all; filling with '{}'", column, UNKNOWN_LABEL);
                UNKNOWN_LABEL.to_string()
            });
            for record in &mut data.records {
                if let Some(slot) = record.text_mut(column) {
                    slot.get_or_insert_with(|| fill.clone());
                }
            }
            summary.text_fills.push((column, fill, missing));
        }

        // ── numeric columns: gaps → median ────────────────────────────────────
        let numeric: Vec<Column> = data
            .columns
            .iter()
            .filter(|c| c.is_numeric())
            .collect();

        for column in numeric {
            let missing = data.null_count_in(column);
            if missing == 0 {
                continue;
            }

            let median = column_median(data, column).unwrap_or_else(|| {
                tracing::warn!("Column '{}' has no values at all; filling with 0", column);
                0.0
            });

            for record in &mut data.records {
                match column.kind() {
                    ColumnKind::Integer => {
                        if let Some(slot) = record.integer_mut(column) {
                            slot.get_or_insert(median.round() as i64);
                        }
                    }
                    ColumnKind::Float => {
                        if let Some(slot) = record.float_mut(column) {
                            slot.get_or_insert(median);
                        }
                    }
                    ColumnKind::Text => {}
                }
            }
            summary.medians.push((column, median, missing));
        }

        summary
    }
}

impl Default for Imputer {
    fn default() -> Self {
        Self::new()
    }
}

/// Most frequent known smoking status. Ties go to the
/// alphabetically first label.
fn smoking_mode(data: &RawDataset) -> Option<SmokingStatus> {
    let mut counts: BTreeMap<&'static str, (SmokingStatus, usize)> = BTreeMap::new();
    for label in data.records.iter().filter_map(|r| r.smoking_history.as_deref()) {
        let status = SmokingStatus::from_label(label);
        if status.is_known() {
            counts.entry(status.label()).or_insert((status, 0)).1 += 1;
        }
    }

    // labels come out in ascending order and only a larger count replaces the best
    counts
        .values()
        .fold(None, |best: Option<(SmokingStatus, usize)>, &(status, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((status, n)),
        })
        .map(|(status, _)| status)
}

/// Most frequent label of a text column. Ties go to the
/// alphabetically first label.
fn text_mode(data: &RawDataset, column: Column) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in &data.records {
        if let Value::Text(label) = record.get(column) {
            *counts.entry(label).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(String, usize)>, (label, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((label, n)),
        })
        .map(|(label, _)| label)
}

/// Median of the non-missing values of a numeric column
pub fn column_median(data: &RawDataset, column: Column) -> Option<f64> {
    let mut values: Vec<f64> = data
        .records
        .iter()
        .filter_map(|r| r.get(column).as_f64())
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::ColumnSet;
    use crate::domain::record::RawRecord;

    fn smoking_rows(labels: &[Option<&str>]) -> RawDataset {
        let columns: ColumnSet = [Column::SmokingHistory].into_iter().collect();
        let records = labels
            .iter()
            .map(|l| RawRecord { smoking_history: l.map(str::to_string), ..Default::default() })
            .collect();
        RawDataset::new(columns, records)
    }

    #[test]
    fn test_sentinel_replaced_by_mode_of_known_values() {
        // "No Info" is the most common label but must never win
        let mut data = smoking_rows(&[
            Some("No Info"), Some("No Info"), Some("No Info"),
            Some("former"), Some("current"), Some("current"),
        ]);
        let summary = Imputer::new().apply(&mut data);

        assert_eq!(summary.smoking_mode, Some(SmokingStatus::Current));
        assert_eq!(summary.smoking_replaced, 3);
        assert!(data.records.iter().take(3).all(|r| r.smoking_history.as_deref() == Some("current")));
    }

    #[test]
    fn test_unknown_and_empty_count_as_sentinel() {
        let mut data = smoking_rows(&[Some("unknown"), None, Some("never")]);
        Imputer::new().apply(&mut data);
        assert!(data.records.iter().all(|r| r.smoking_history.as_deref() == Some("never")));
    }

    #[test]
    fn test_mode_tie_goes_to_first_label() {
        let mut data = smoking_rows(&[Some("never"), Some("former"), Some("No Info")]);
        let summary = Imputer::new().apply(&mut data);
        assert_eq!(summary.smoking_mode, Some(SmokingStatus::Former));
    }

    #[test]
    fn test_no_known_values_keeps_sentinel() {
        let mut data = smoking_rows(&[Some("No Info"), None]);
        let summary = Imputer::new().apply(&mut data);
        assert_eq!(summary.smoking_mode, None);
        assert!(data.records.iter().all(|r| r.smoking_history.as_deref() == Some("No Info")));
    }

    #[test]
    fn test_numeric_gaps_filled_with_median() {
        let columns: ColumnSet = [Column::Bmi, Column::Hypertension].into_iter().collect();
        let rows = vec![
            RawRecord { bmi: Some(20.0), hypertension: Some(0), ..Default::default() },
            RawRecord { bmi: Some(30.0), hypertension: Some(1), ..Default::default() },
            RawRecord { bmi: Some(100.0), hypertension: None, ..Default::default() },
            RawRecord { bmi: None, hypertension: Some(1), ..Default::default() },
        ];
        let mut data = RawDataset::new(columns, rows);
        let summary = Imputer::new().apply(&mut data);

        // median, not mean: robust to the 100.0 outlier
        assert_eq!(data.records[3].bmi, Some(30.0));
        assert_eq!(data.records[2].hypertension, Some(1));
        assert_eq!(data.null_count(), 0);
        assert_eq!(summary.medians.len(), 2);
    }

    #[test]
    fn test_empty_gender_and_location_get_the_mode() {
        let columns: ColumnSet = [Column::Gender, Column::Location].into_iter().collect();
        let person = |gender: Option<&str>, location: Option<&str>| RawRecord {
            gender:   gender.map(str::to_string),
            location: location.map(str::to_string),
            ..Default::default()
        };
        let mut data = RawDataset::new(columns, vec![
            person(Some("Female"), Some("Utah")),
            person(Some("Male"), Some("Ohio")),
            person(Some("Female"), Some("Ohio")),
            person(None, None),
        ]);
        let summary = Imputer::new().apply(&mut data);

        assert_eq!(data.records[3].gender.as_deref(), Some("Female"));
        assert_eq!(data.records[3].location.as_deref(), Some("Ohio"));
        assert_eq!(data.null_count(), 0);
        assert_eq!(summary.text_fills.len(), 2);
    }

    #[test]
    fn test_text_column_without_labels_gets_placeholder() {
        let columns: ColumnSet = [Column::Location].into_iter().collect();
        let mut data = RawDataset::new(columns, vec![RawRecord::default()]);
        Imputer::new().apply(&mut data);
        assert_eq!(data.records[0].location.as_deref(), Some(UNKNOWN_LABEL));
    }

    #[test]
    fn test_absent_columns_are_skipped() {
        let mut data = RawDataset::new(ColumnSet::new(), vec![RawRecord::default()]);
        let summary = Imputer::new().apply(&mut data);
        assert_eq!(summary, ImputationSummary::default());
        assert_eq!(data.records[0], RawRecord::default());
    }
}
