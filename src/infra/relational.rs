// ============================================================
// Layer 6 - Relational Store Selection
// ============================================================
// Picks the relational gateway from `DatabaseConfig::backend`:
//
//   sqlite    SqliteStore on the configured file (always built)
//   postgres  PostgresStore; needs the `postgres` feature

use anyhow::Result;

use crate::application::config::{DatabaseBackend, DatabaseConfig};
use crate::domain::traits::RelationalStore;
use crate::infra::sqlite_store::SqliteStore;

/// Open the configured relational store
pub fn open_relational_store(cfg: &DatabaseConfig) -> Result<Box<dyn RelationalStore>> {
    match cfg.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite database '{}'", cfg.path.display());
            Ok(Box::new(SqliteStore::open(&cfg.path)?))
        }
        DatabaseBackend::Postgres => {
            tracing::info!(
                "Using PostgreSQL {}:{}/{}",
                cfg.postgres.host,
                cfg.postgres.port,
                cfg.postgres.dbname
            );
            open_postgres(cfg)
        }
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(cfg: &DatabaseConfig) -> Result<Box<dyn RelationalStore>> {
    use crate::infra::postgres_store::PostgresStore;

    Ok(Box::new(PostgresStore::connect(&cfg.postgres)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_cfg: &DatabaseConfig) -> Result<Box<dyn RelationalStore>> {
    anyhow::bail!("PostgreSQL support is not compiled in; rebuild with `--features postgres`")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_backend_opens_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DatabaseConfig { path: dir.path().join("db").join("pipeline.db"), ..Default::default() };

        let mut store = open_relational_store(&cfg).unwrap();
        store.execute_ddl("CREATE TABLE t (x INTEGER)").unwrap();
        assert_eq!(store.count("t").unwrap(), 0);
        assert_eq!(store.generated_key_ddl(), "INTEGER PRIMARY KEY");
        assert!(cfg.path.exists());
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_postgres_backend_needs_the_feature() {
        let cfg = DatabaseConfig { backend: DatabaseBackend::Postgres, ..Default::default() };
        let err = open_relational_store(&cfg).err().unwrap();
        assert!(err.to_string().contains("--features postgres"));
    }
}
