//! Database handles.
//!
//! A [`Database`] is the live handle for one project: a sqlx pool for the
//! project's dialect. Pools are opened through a [`Connector`] so the manager
//! can be exercised with instrumented or failing connectors.

use std::fmt;

use async_trait::async_trait;
use common::config::{DbConfig, Dialect};
use common::errors::{AppError, AppResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{MySqlPool, SqlitePool};

/// Runs the same expression against whichever pool variant is active.
///
/// SQLite and MySQL share `?` placeholders, so query text and binds are
/// identical; only the executor type differs.
macro_rules! on_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool {
            $crate::database::DbPool::Sqlite($p) => $body,
            $crate::database::DbPool::MySql($p) => $body,
        }
    };
}
pub(crate) use on_pool;

/// Maps a sqlx failure on an established pool.
pub(crate) fn query_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseQuery(e.to_string())
}

/// Connection pool wrapper for the supported dialects.
#[derive(Debug, Clone)]
pub enum DbPool {
    /// Embedded SQLite file.
    Sqlite(SqlitePool),
    /// MySQL / MariaDB server.
    MySql(MySqlPool),
}

impl DbPool {
    pub fn dialect(&self) -> Dialect {
        match self {
            DbPool::Sqlite(_) => Dialect::Sqlite,
            DbPool::MySql(_) => Dialect::MySql,
        }
    }

    /// Round-trips `SELECT 1`.
    pub async fn ping(&self) -> AppResult<()> {
        on_pool!(self, pool => {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(query_error)?;
        });
        Ok(())
    }

    /// Executes a statement without binds (DDL) and returns the affected row count.
    pub async fn execute(&self, sql: &str) -> AppResult<u64> {
        let affected = on_pool!(self, pool => {
            sqlx::query(sql)
                .execute(pool)
                .await
                .map_err(query_error)?
                .rows_affected()
        });
        Ok(affected)
    }

    /// Column names of `table`, empty when the table does not exist.
    pub async fn column_names(&self, table: &str) -> AppResult<Vec<String>> {
        let names = match self {
            DbPool::Sqlite(pool) => {
                sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
                    .bind(table)
                    .fetch_all(pool)
                    .await
            }
            DbPool::MySql(pool) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT CAST(COLUMN_NAME AS CHAR) AS name
                     FROM information_schema.columns
                     WHERE table_schema = DATABASE() AND table_name = ?
                     ORDER BY ORDINAL_POSITION",
                )
                .bind(table)
                .fetch_all(pool)
                .await
            }
        };
        names.map_err(query_error)
    }

    /// Closes every connection in the pool and waits for them to be released.
    pub async fn close(&self) {
        on_pool!(self, pool => pool.close().await)
    }
}

/// Live database handle for one project.
pub struct Database {
    project: String,
    pool: DbPool,
}

impl Database {
    pub fn new(project: impl Into<String>, pool: DbPool) -> Self {
        Self {
            project: project.into(),
            pool,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("project", &self.project)
            .field("dialect", &self.dialect())
            .finish()
    }
}

/// Opens and verifies a pool for a resolved configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects and authenticates. Must not return a pool that failed verification.
    async fn connect(&self, project: &str, config: &DbConfig) -> AppResult<DbPool>;
}

/// Production connector backed by sqlx pools.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlxConnector;

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self, project: &str, config: &DbConfig) -> AppResult<DbPool> {
        let pool = match config {
            DbConfig::Sqlite { storage } => {
                if let Some(parent) = storage.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        AppError::DatabaseConnection(format!(
                            "cannot create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(storage)
                    .create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(options)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DbPool::Sqlite(pool)
            }
            DbConfig::MySql(cfg) => {
                let options = MySqlConnectOptions::new()
                    .host(&cfg.host)
                    .port(cfg.port)
                    .database(&cfg.database)
                    .username(&cfg.username)
                    .password(&cfg.password);
                let pool = MySqlPoolOptions::new()
                    .max_connections(cfg.pool.max_connections)
                    .min_connections(cfg.pool.min_connections)
                    .acquire_timeout(cfg.pool.acquire_timeout)
                    .idle_timeout(Some(cfg.pool.idle_timeout))
                    .connect_with(options)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DbPool::MySql(pool)
            }
        };

        if let Err(e) = pool.ping().await {
            pool.close().await;
            return Err(AppError::DatabaseConnection(format!(
                "{}: verification failed: {}",
                project, e
            )));
        }

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_sqlite_connect_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("nested").join("acme.sqlite");
        let config = DbConfig::Sqlite {
            storage: storage.clone(),
        };

        let pool = SqlxConnector.connect("acme", &config).await.unwrap();
        assert_eq!(pool.dialect(), Dialect::Sqlite);
        assert!(storage.exists());

        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT)")
            .await
            .unwrap();
        assert_eq!(pool.column_names("t").await.unwrap(), vec!["id", "label"]);
        assert!(pool.column_names("missing").await.unwrap().is_empty());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_connect_failure() {
        // Parent "directory" is a regular file.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = DbConfig::Sqlite {
            storage: PathBuf::from(&blocker).join("acme.sqlite"),
        };

        let err = SqlxConnector.connect("acme", &config).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseConnection(_)));
    }
}
