/// SQLite connection pool construction
use crate::error::{VaultError, VaultResult};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> VaultResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePool::connect_with(
        sqlx::sqlite::SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(if options.enable_wal {
                sqlx::sqlite::SqliteJournalMode::Wal
            } else {
                sqlx::sqlite::SqliteJournalMode::Delete
            })
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5)),
    )
    .await
    .map_err(VaultError::Database)?;

    Ok(pool)
}

/// Create an in-memory pool for tests and throwaway setups
pub async fn create_memory_pool() -> VaultResult<SqlitePool> {
    SqlitePool::connect(":memory:")
        .await
        .map_err(VaultError::Database)
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> VaultResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(VaultError::Database)?;

    Ok(())
}
