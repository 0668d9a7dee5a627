// ============================================================
// Layer 4 - Dataset
// ============================================================
// A batch of typed rows together with the set of columns that
// were actually present in the source. Every stage receives and
// returns one of these, so "is this column here?" is always
// answered by `columns`, never by peeking at a row.

use crate::domain::column::{Column, ColumnSet};
use crate::domain::record::{CleanedRecord, RawRecord, Row};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset<R> {
    /// Columns present in this batch
    pub columns: ColumnSet,
    /// One entry per row, in source order
    pub records: Vec<R>,
}

/// Rows straight out of the extractor
pub type RawDataset = Dataset<RawRecord>;

/// Rows produced by the cleaner
pub type CleanedDataset = Dataset<CleanedRecord>;

impl<R: Row> Dataset<R> {
    pub fn new(columns: ColumnSet, records: Vec<R>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of missing cells in one present column
    pub fn null_count_in(&self, column: Column) -> usize {
        if !self.columns.contains(column) {
            return 0;
        }
        self.records.iter().filter(|r| r.get(column).is_null()).count()
    }

    /// Number of missing cells across all present columns
    pub fn null_count(&self) -> usize {
        self.columns.iter().map(|c| self.null_count_in(c)).sum()
    }

    /// (rows, columns), for logging
    pub fn shape(&self) -> (usize, usize) {
        (self.records.len(), self.columns.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Value;

    #[test]
    fn test_null_counts_only_present_columns() {
        let columns: ColumnSet = [Column::Age, Column::Bmi].into_iter().collect();
        let mut a = RawRecord::default();
        a.set(Column::Age, Value::Real(40.0));
        let b = RawRecord::default();
        let data = Dataset::new(columns, vec![a, b]);

        assert_eq!(data.null_count_in(Column::Age), 1);
        assert_eq!(data.null_count_in(Column::Bmi), 2);
        // absent column never counts as missing
        assert_eq!(data.null_count_in(Column::Year), 0);
        assert_eq!(data.null_count(), 3);
        assert_eq!(data.shape(), (2, 2));
    }
}
