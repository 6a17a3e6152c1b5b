/// User store backed by SQLite
use crate::error::{VaultError, VaultResult};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub created_at: i64,
}

/// User persistence over a SQLite pool.
///
/// Writes are serialized behind a process-internal mutex; the embedded
/// driver does not tolerate concurrent writers.
pub struct UserStore {
    db: SqlitePool,
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Create a store and ensure the schema exists.
    pub async fn new(db: SqlitePool) -> VaultResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT    UNIQUE NOT NULL,
                password_hash BLOB    NOT NULL,
                created_at    INTEGER NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .map_err(VaultError::Database)?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Insert a new user; Conflict when the username is taken.
    pub async fn create_user(&self, username: &str, password_hash: &[u8]) -> VaultResult<()> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                VaultError::Conflict(format!("user {username:?} already exists")),
            ),
            Err(e) => Err(VaultError::Database(e)),
        }
    }

    /// Look up a user by username; NotFound when absent.
    pub async fn get_by_username(&self, username: &str) -> VaultResult<User> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(VaultError::Database)?
        .ok_or_else(|| VaultError::NotFound(format!("user {username:?}")))?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_store() -> UserStore {
        let pool = db::create_memory_pool().await.unwrap();
        UserStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = test_store().await;

        store.create_user("alice", b"hash").await.unwrap();

        let user = store.get_by_username("alice").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, b"hash");
        assert!(user.created_at > 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = test_store().await;

        store.create_user("alice", b"hash").await.unwrap();

        let err = store.create_user("alice", b"other").await.unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_user_not_found() {
        let store = test_store().await;

        let err = store.get_by_username("nobody").await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }
}
