// ============================================================
// Layer 2 - AnalysisUseCase
// ============================================================
// Runs a file of analytical SQL against the loaded table.
//
//   Step 1: Split the script on ';'
//   Step 2: Drop fragments that hold only comments/whitespace
//   Step 3: Run each query; a failing query is reported and
//           the rest still run
//
// Results come back as plain data; the CLI renders them with
// `render_table`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::record::Value;
use crate::domain::traits::RelationalStore;

/// Result of one statement from the script
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub sql:    String,
    pub result: std::result::Result<(Vec<String>, Vec<Vec<Value>>), String>,
}

pub struct AnalysisUseCase<'a> {
    db: &'a mut dyn RelationalStore,
}

impl<'a> AnalysisUseCase<'a> {
    pub fn new(db: &'a mut dyn RelationalStore) -> Self {
        Self { db }
    }

    pub fn execute_file(&mut self, script: &Path) -> Result<Vec<QueryOutcome>> {
        let text = fs::read_to_string(script)
            .with_context(|| format!("Cannot read SQL script '{}'", script.display()))?;
        Ok(self.execute(&text))
    }

    pub fn execute(&mut self, script: &str) -> Vec<QueryOutcome> {
        let statements = split_statements(script);
        tracing::info!("Running {} analytical queries", statements.len());

        statements
            .into_iter()
            .enumerate()
            .map(|(i, sql)| {
                let result = self.db.query(&sql).map_err(|e| {
                    tracing::warn!("Query {} failed: {:#}", i + 1, e);
                    format!("{e:#}")
                });
                QueryOutcome { sql, result }
            })
            .collect()
    }
}

/// Statements of a `;`-separated script, comment-only fragments removed
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|fragment| {
            fragment
                .lines()
                .map(str::trim)
                .any(|line| !line.is_empty() && !line.starts_with("--"))
        })
        .map(String::from)
        .collect()
}

/// Render rows as an aligned text table
pub fn render_table(columns: &[String], rows: &[Vec<Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(format_cell).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = vec![
        padded_row(columns.iter(), &widths),
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"),
    ];
    out.extend(cells.iter().map(|row| padded_row(row.iter(), &widths)));
    out.push(format!("({} rows)", rows.len()));
    out.join("\n")
}

fn padded_row<'a>(values: impl Iterator<Item = &'a String>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(v, &w)| format!("{v:<w$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null    => "NULL".to_string(),
        Value::Real(v) => format!("{v:.4}"),
        other          => other.to_string(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite_store::SqliteStore;

    #[test]
    fn test_split_skips_comment_only_fragments() {
        let script = "\
-- Query 1: totals
SELECT 1;

-- trailing comment only
;
SELECT 2 -- inline
;
";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("SELECT 1"));
        assert!(statements[1].starts_with("SELECT 2"));
    }

    #[test]
    fn test_failing_query_does_not_stop_the_rest() {
        let mut db = SqliteStore::in_memory().unwrap();
        let outcomes = AnalysisUseCase::new(&mut db).execute("SELECT * FROM missing_table; SELECT 42 AS answer;");

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        let (columns, rows) = outcomes[1].result.clone().unwrap();
        assert_eq!(columns, vec!["answer"]);
        assert_eq!(rows, vec![vec![Value::Integer(42)]]);
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let table = render_table(
            &["diabetes".to_string(), "avg_bmi".to_string()],
            &[vec![Value::Integer(0), Value::Real(27.5)], vec![Value::Integer(1), Value::Null]],
        );
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "diabetes | avg_bmi");
        assert_eq!(lines[1], "---------+--------");
        assert_eq!(lines[2], "0        | 27.5000");
        assert_eq!(lines[3], "1        | NULL");
        assert_eq!(lines[4], "(2 rows)");
    }
}
