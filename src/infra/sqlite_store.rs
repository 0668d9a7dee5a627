// ============================================================
// Layer 6 - SQLite Relational Store
// ============================================================
// `RelationalStore` over rusqlite. A file path gives a durable
// database; `in_memory()` gives a throwaway one for tests.
//
// Bulk inserts run inside one transaction per call and use
// multi-row statements:
//
//   INSERT INTO t (a, b) VALUES (?, ?), (?, ?), ...
//
// A statement carries at most MAX_PARAMS placeholders, so a
// large call is cut into several statements within the same
// transaction.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use crate::domain::column::checked_identifier;
use crate::domain::record::Value;
use crate::domain::traits::RelationalStore;

/// SQLite's compile-time default for bound parameters (3.32+)
const MAX_PARAMS: usize = 32_766;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null       => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v)    => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s)    => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null       => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(f)    => Value::Real(f),
            SqlValue::Text(s)    => Value::Text(s),
            SqlValue::Blob(b)    => Value::Text(format!("<{} bytes>", b.len())),
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Cannot open SQLite database '{}'", path.display()))?;
        tracing::debug!("Opened SQLite database '{}'", path.display());
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Cannot open in-memory SQLite database")?;
        Ok(Self { conn })
    }
}

impl RelationalStore for SqliteStore {
    fn execute_ddl(&mut self, statement: &str) -> Result<()> {
        self.conn
            .execute_batch(statement)
            .with_context(|| format!("DDL failed: {statement}"))
    }

    fn bulk_insert(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            bail!("bulk insert into '{table}' needs at least one column");
        }
        let table = checked_identifier(table)?;
        let column_list = columns
            .iter()
            .map(|c| checked_identifier(c))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join(", ");

        let width       = columns.len();
        let per_stmt    = (MAX_PARAMS / width).max(1);
        let placeholder = format!("({})", vec!["?"; width].join(", "));

        let tx = self.conn.transaction().context("Cannot begin transaction")?;
        let mut written = 0usize;
        for chunk in rows.chunks(per_stmt) {
            if let Some(bad) = chunk.iter().find(|r| r.len() != width) {
                bail!("row has {} values but {} columns were named", bad.len(), width);
            }
            let sql = format!(
                "INSERT INTO {table} ({column_list}) VALUES {}",
                vec![placeholder.as_str(); chunk.len()].join(", ")
            );
            written += tx
                .execute(&sql, params_from_iter(chunk.iter().flatten()))
                .with_context(|| format!("Insert into '{table}' failed"))?;
        }
        tx.commit().context("Cannot commit insert transaction")?;
        Ok(written)
    }

    fn query(&mut self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let mut stmt = self.conn.prepare(sql).with_context(|| format!("Cannot prepare: {sql}"))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Query failed: {sql}"))?;

        Ok((columns, rows))
    }

    fn count(&mut self, table: &str) -> Result<usize> {
        let table = checked_identifier(table)?;
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("Cannot count rows of '{table}'"))?;
        Ok(n as usize)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_table() -> SqliteStore {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .execute_ddl("CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(10), score FLOAT, n INTEGER)")
            .unwrap();
        store
    }

    fn cols() -> Vec<String> {
        vec!["name".into(), "score".into(), "n".into()]
    }

    #[test]
    fn test_insert_and_query_round_trip() {
        let mut store = store_with_table();
        let rows = vec![
            vec![Value::Text("a".into()), Value::Real(1.5), Value::Integer(1)],
            vec![Value::Text("b".into()), Value::Null, Value::Integer(2)],
        ];
        assert_eq!(store.bulk_insert("t", &cols(), &rows).unwrap(), 2);
        assert_eq!(store.count("t").unwrap(), 2);

        let (names, got) = store.query("SELECT name, score, n FROM t ORDER BY id").unwrap();
        assert_eq!(names, vec!["name", "score", "n"]);
        assert_eq!(got, rows);
    }

    #[test]
    fn test_large_insert_is_split_into_statements() {
        let mut store = store_with_table();
        let rows: Vec<Vec<Value>> = (0..12_000)
            .map(|i| vec![Value::Text("x".into()), Value::Real(i as f64), Value::Integer(i)])
            .collect();
        assert_eq!(store.bulk_insert("t", &cols(), &rows).unwrap(), 12_000);
        assert_eq!(store.count("t").unwrap(), 12_000);
    }

    #[test]
    fn test_ragged_row_rolls_back() {
        let mut store = store_with_table();
        let rows = vec![
            vec![Value::Text("a".into()), Value::Real(1.0), Value::Integer(1)],
            vec![Value::Text("b".into())],
        ];
        assert!(store.bulk_insert("t", &cols(), &rows).is_err());
        assert_eq!(store.count("t").unwrap(), 0);
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let mut store = store_with_table();
        assert!(store.count("t; DROP TABLE t").is_err());
        assert!(checked_identifier("diabetes_clean").is_ok());
        assert!(checked_identifier("1abc").is_err());
    }
}
