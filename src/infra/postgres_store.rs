// ============================================================
// Layer 6 - PostgreSQL Relational Store
// ============================================================
// `RelationalStore` over tokio-postgres, built with the
// `postgres` feature. The pipeline is synchronous, so the
// store owns a single-threaded tokio runtime and blocks on
// every call; the connection task only makes progress inside
// those calls.
//
// Bulk inserts run in one transaction per call. Every bound
// value carries an explicit cast so the server can assign it
// to the typed column; nulls are written as literals:
//
//   INSERT INTO t (a, b, c) VALUES ($1::BIGINT, NULL, $2::TEXT), ...
//
// Queries go through the simple-query protocol, which returns
// every cell as text; cells are read back as integer, real or
// text in that order of preference.

use anyhow::{bail, Context, Result};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::application::config::PostgresConfig;
use crate::domain::column::checked_identifier;
use crate::domain::record::Value;
use crate::domain::traits::RelationalStore;

/// Bound parameters per statement (server limit is 65 535)
const MAX_PARAMS: usize = 32_766;

pub struct PostgresStore {
    runtime: Runtime,
    client:  Client,
}

impl PostgresStore {
    pub fn connect(cfg: &PostgresConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Cannot start the database runtime")?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(&connection_string(cfg), NoTls))
            .with_context(|| format!("Cannot connect to PostgreSQL at {}:{}/{}", cfg.host, cfg.port, cfg.dbname))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection closed: {}", e);
            }
        });

        tracing::debug!("Connected to PostgreSQL {}:{}/{} as {}", cfg.host, cfg.port, cfg.dbname, cfg.user);
        Ok(Self { runtime, client })
    }
}

impl RelationalStore for PostgresStore {
    fn execute_ddl(&mut self, statement: &str) -> Result<()> {
        self.runtime
            .block_on(self.client.batch_execute(statement))
            .with_context(|| format!("DDL failed: {statement}"))
    }

    fn bulk_insert(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<usize> {
        if columns.is_empty() {
            bail!("bulk insert into '{table}' needs at least one column");
        }
        let table = checked_identifier(table)?;
        let column_list = columns
            .iter()
            .map(|c| checked_identifier(c))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join(", ");

        let width = columns.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            bail!("row has {} values but {} columns were named", bad.len(), width);
        }
        let per_stmt = (MAX_PARAMS / width).max(1);

        let Self { runtime, client } = self;
        let written = runtime
            .block_on(async {
                let tx = client.transaction().await?;
                let mut written = 0u64;
                for chunk in rows.chunks(per_stmt) {
                    let (sql, params) = insert_statement(table, &column_list, chunk);
                    written += tx.execute(sql.as_str(), &params).await?;
                }
                tx.commit().await?;
                Ok::<u64, tokio_postgres::Error>(written)
            })
            .with_context(|| format!("Bulk insert into '{table}' failed"))?;

        Ok(usize::try_from(written)?)
    }

    fn query(&mut self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let messages = self
            .runtime
            .block_on(self.client.simple_query(sql))
            .with_context(|| format!("Query failed: {sql}"))?;

        let mut columns = Vec::new();
        let mut rows    = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                rows.push((0..row.len()).map(|i| text_value(row.get(i))).collect());
            }
        }
        Ok((columns, rows))
    }

    fn count(&mut self, table: &str) -> Result<usize> {
        let table = checked_identifier(table)?;
        let sql   = format!("SELECT COUNT(*) FROM {table}");
        let row   = self
            .runtime
            .block_on(self.client.query_one(sql.as_str(), &[]))
            .with_context(|| format!("Cannot count rows of '{table}'"))?;
        let n: i64 = row.try_get(0)?;
        Ok(usize::try_from(n)?)
    }

    fn generated_key_ddl(&self) -> &'static str {
        "SERIAL PRIMARY KEY"
    }
}

/// libpq key/value connection string with quoted values
fn connection_string(cfg: &PostgresConfig) -> String {
    let quote = |v: &str| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'"));
    format!(
        "host={} port={} dbname={} user={} password={}",
        quote(&cfg.host),
        cfg.port,
        quote(&cfg.dbname),
        quote(&cfg.user),
        quote(&cfg.password)
    )
}

/// Multi-row INSERT for `chunk` and the values it binds, in order
fn insert_statement<'a>(
    table: &str,
    column_list: &str,
    chunk: &'a [Vec<Value>],
) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
    let mut params: Vec<&'a (dyn ToSql + Sync)> = Vec::new();
    let mut tuples = Vec::with_capacity(chunk.len());

    for row in chunk {
        let mut cells = Vec::with_capacity(row.len());
        for value in row {
            let cast = match value {
                Value::Null => {
                    cells.push("NULL".to_string());
                    continue;
                }
                Value::Integer(v) => {
                    params.push(v);
                    "BIGINT"
                }
                Value::Real(v) => {
                    params.push(v);
                    "FLOAT8"
                }
                Value::Text(v) => {
                    params.push(v);
                    "TEXT"
                }
            };
            cells.push(format!("${}::{cast}", params.len()));
        }
        tuples.push(format!("({})", cells.join(", ")));
    }

    (format!("INSERT INTO {table} ({column_list}) VALUES {}", tuples.join(", ")), params)
}

fn text_value(cell: Option<&str>) -> Value {
    match cell {
        None => Value::Null,
        Some(s) => s
            .parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| s.parse::<f64>().map(Value::Real))
            .unwrap_or_else(|_| Value::Text(s.to_string())),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_casts_values_and_inlines_nulls() {
        let rows = vec![
            vec![Value::Integer(1), Value::Null, Value::Text("Ohio".into())],
            vec![Value::Integer(2), Value::Real(0.5), Value::Null],
        ];
        let (sql, params) = insert_statement("diabetes_clean", "year, bmi, location", &rows);

        assert_eq!(
            sql,
            "INSERT INTO diabetes_clean (year, bmi, location) VALUES \
             ($1::BIGINT, NULL, $2::TEXT), ($3::BIGINT, $4::FLOAT8, NULL)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_cells_read_back_with_their_type() {
        assert_eq!(text_value(None), Value::Null);
        assert_eq!(text_value(Some("42")), Value::Integer(42));
        assert_eq!(text_value(Some("12.50")), Value::Real(12.5));
        assert_eq!(text_value(Some("Female")), Value::Text("Female".into()));
    }

    #[test]
    fn test_connection_string_quotes_values() {
        let cfg = PostgresConfig { password: "it's secret".into(), ..Default::default() };
        assert_eq!(
            connection_string(&cfg),
            "host='postgres' port=5432 dbname='diabetes_db' user='airflow' password='it\\'s secret'"
        );
    }
}
