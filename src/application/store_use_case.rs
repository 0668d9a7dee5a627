// ============================================================
// Layer 2 - StoreUseCase (Stage 3)
// ============================================================
// Loads the cleaned CSV into the relational store as a
// destructive full refresh:
//
//   Step 1: Read cleaned CSV                   (Layer 4 - data)
//   Step 2: DROP + CREATE the table            (Layer 6 - infra)
//   Step 3: Insert rows in fixed-size batches  (Layer 6 - infra)
//   Step 4: Verify the row count               (Layer 6 - infra)
//   Step 5: Build the analytical indexes       (Layer 6 - infra)
//
// The schema is fixed: a generated key plus all 19 columns,
// whether or not a column was present in this batch (absent
// columns load as NULL). A failure after Step 2 leaves the
// table empty or partial; the count check in Step 4 catches
// the partial case.

use std::path::Path;

use anyhow::Result;

use crate::application::config::DatabaseConfig;
use crate::data::loader::read_csv;
use crate::domain::column::{checked_identifier, Column};
use crate::domain::error::PipelineError;
use crate::domain::record::{CleanedRecord, Row, Value};
use crate::domain::traits::RelationalStore;

/// Indexed columns, as (index name, column)
const INDEXES: [(&str, Column); 3] = [
    ("idx_age", Column::Age),
    ("idx_diabetes", Column::Diabetes),
    ("idx_bmi", Column::Bmi),
];

pub struct StoreUseCase<'a> {
    db:     &'a mut dyn RelationalStore,
    config: DatabaseConfig,
}

impl<'a> StoreUseCase<'a> {
    pub fn new(db: &'a mut dyn RelationalStore, config: &DatabaseConfig) -> Self {
        Self { db, config: config.clone() }
    }

    /// Replace the table contents with `input`; returns rows loaded
    pub fn execute(&mut self, input: &Path) -> Result<usize> {
        let table = checked_identifier(&self.config.table)?.to_string();

        // ── Step 1: Read the cleaned CSV ─────────────────────────────────────
        let data = read_csv::<CleanedRecord>(input)?;
        tracing::info!("Loaded {} cleaned rows from '{}'", data.len(), input.display());

        // ── Step 2: Recreate the table ───────────────────────────────────────
        let create = create_table_ddl(&table, self.db.generated_key_ddl());
        self.db.execute_ddl(&format!("DROP TABLE IF EXISTS {table}"))?;
        self.db.execute_ddl(&create)?;
        tracing::info!("Recreated table '{}'", table);

        // ── Step 3: Bulk insert ──────────────────────────────────────────────
        let columns: Vec<Column> = Column::all().collect();
        let names: Vec<String>   = columns.iter().map(|c| c.sql_name()).collect();
        let batch_size           = self.config.batch_size.max(1);
        let total_batches        = data.len().div_ceil(batch_size);

        for (i, batch) in data.records.chunks(batch_size).enumerate() {
            let rows: Vec<Vec<Value>> = batch
                .iter()
                .map(|record| columns.iter().map(|c| record.get(*c)).collect())
                .collect();
            self.db.bulk_insert(&table, &names, &rows)?;
            tracing::debug!("Inserted batch {}/{} ({} rows)", i + 1, total_batches, rows.len());
        }

        // ── Step 4: Verify ───────────────────────────────────────────────────
        let actual = self.db.count(&table)?;
        if actual != data.len() {
            return Err(PipelineError::RowCountMismatch {
                table,
                expected: data.len(),
                actual,
            }
            .into());
        }
        tracing::info!("Verified {} rows in '{}'", actual, table);

        // ── Step 5: Indexes ──────────────────────────────────────────────────
        for (name, column) in INDEXES {
            self.db.execute_ddl(&format!(
                "CREATE INDEX IF NOT EXISTS {name} ON {table}({})",
                column.sql_name()
            ))?;
        }
        tracing::info!("Created indexes {:?}", INDEXES.map(|(name, _)| name));

        Ok(actual)
    }
}

/// `CREATE TABLE` for the fixed destination schema
pub fn create_table_ddl(table: &str, key_ddl: &str) -> String {
    let mut columns = vec![format!("id {key_ddl}")];
    columns.extend(Column::all().map(|c| format!("{} {}", c.sql_name(), c.sql_type())));
    format!("CREATE TABLE {table} (\n    {}\n)", columns.join(",\n    "))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite_store::SqliteStore;
    use std::fs;

    const CLEAN: &str = "\
gender,age,bmi,diabetes,gender_encoded
Female,-1.2,0.3,0,0
Male,0.4,-0.9,1,1
Female,0.8,0.6,0,0
";

    fn cfg(batch_size: usize) -> DatabaseConfig {
        DatabaseConfig { batch_size, ..Default::default() }
    }

    #[test]
    fn test_ddl_has_key_and_all_typed_columns() {
        let ddl = create_table_ddl("diabetes_clean", "INTEGER PRIMARY KEY");
        assert!(ddl.starts_with("CREATE TABLE diabetes_clean ("));
        assert!(ddl.contains("id INTEGER PRIMARY KEY"));
        assert!(ddl.contains("race_african_american INTEGER"));
        assert!(ddl.contains("hba1c_level FLOAT"));
        assert!(ddl.contains("location VARCHAR(50)"));
        assert_eq!(ddl.matches(",\n").count(), 19);
    }

    #[test]
    fn test_loads_every_row_in_batches() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        fs::write(&path, CLEAN).unwrap();

        let mut db = SqliteStore::in_memory().unwrap();
        let n = StoreUseCase::new(&mut db, &cfg(2)).execute(&path).unwrap();
        assert_eq!(n, 3);
        assert_eq!(db.count("diabetes_clean").unwrap(), 3);

        let (_, rows) = db
            .query("SELECT gender, diabetes, year FROM diabetes_clean ORDER BY id")
            .unwrap();
        assert_eq!(rows[1], vec![Value::Text("Male".into()), Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_rerun_replaces_previous_contents() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        fs::write(&path, CLEAN).unwrap();

        let mut db = SqliteStore::in_memory().unwrap();
        StoreUseCase::new(&mut db, &cfg(1000)).execute(&path).unwrap();
        StoreUseCase::new(&mut db, &cfg(1000)).execute(&path).unwrap();
        assert_eq!(db.count("diabetes_clean").unwrap(), 3);
    }

    #[test]
    fn test_indexes_are_created() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        fs::write(&path, CLEAN).unwrap();

        let mut db = SqliteStore::in_memory().unwrap();
        StoreUseCase::new(&mut db, &cfg(1000)).execute(&path).unwrap();

        let (_, rows) = db
            .query("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
            .unwrap();
        let names: Vec<_> = rows.into_iter().map(|r| r[0].to_string()).collect();
        assert_eq!(names, vec!["idx_age", "idx_bmi", "idx_diabetes"]);
    }

    #[test]
    fn test_unsafe_table_name_is_refused_before_any_ddl() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        fs::write(&path, CLEAN).unwrap();

        let mut db = SqliteStore::in_memory().unwrap();
        db.execute_ddl("CREATE TABLE keep (x INTEGER)").unwrap();
        let config = DatabaseConfig { table: "diabetes_clean; DROP TABLE keep".into(), ..Default::default() };

        let err = StoreUseCase::new(&mut db, &config).execute(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Schema(_))));
        assert_eq!(db.count("keep").unwrap(), 0);
    }

    /// Drops every insert on the floor
    struct LossyStore(SqliteStore);

    impl RelationalStore for LossyStore {
        fn execute_ddl(&mut self, statement: &str) -> Result<()> {
            self.0.execute_ddl(statement)
        }
        fn bulk_insert(&mut self, _: &str, _: &[String], rows: &[Vec<Value>]) -> Result<usize> {
            Ok(rows.len())
        }
        fn query(&mut self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
            self.0.query(sql)
        }
        fn count(&mut self, table: &str) -> Result<usize> {
            self.0.count(table)
        }
    }

    #[test]
    fn test_lost_rows_are_a_hard_failure() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        fs::write(&path, CLEAN).unwrap();

        let mut db = LossyStore(SqliteStore::in_memory().unwrap());
        let err = StoreUseCase::new(&mut db, &cfg(1000)).execute(&path).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::RowCountMismatch { expected, actual, .. }) => {
                assert_eq!((*expected, *actual), (3, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
