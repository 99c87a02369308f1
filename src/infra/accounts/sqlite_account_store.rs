// SQLite implementation of the AccountStore trait.
//
// Tables:
// - profiles: member-facing profiles, keyed by owner_user_id
// - users_private: private per-user record
// - auth_identities: login identities

use crate::core::accounts::{AccountError, AccountStore};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Create a new SQLite account store with the given database path.
    pub async fn new(database_path: &str) -> Result<Self, AccountError> {
        let connection_string = if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            format!("sqlite://{}?mode=rwc", database_path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
            .map_err(|e| AccountError::Storage(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create tables.
    async fn migrate(&self) -> Result<(), AccountError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_user_id TEXT NOT NULL,
                display_name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_profiles_owner ON profiles(owner_user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users_private (
                id TEXT PRIMARY KEY,
                phone TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_identities (
                user_id TEXT PRIMARY KEY,
                email TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn delete_profiles(&self, user_id: &str) -> Result<u64, AccountError> {
        let result = sqlx::query("DELETE FROM profiles WHERE owner_user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::Storage(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_private_record(&self, user_id: &str) -> Result<u64, AccountError> {
        let result = sqlx::query("DELETE FROM users_private WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::Storage(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_identity(&self, user_id: &str) -> Result<(), AccountError> {
        sqlx::query("DELETE FROM auth_identities WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::IdentityDeletion(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accounts::AccountService;
    use sqlx::Row;
    use tempfile::NamedTempFile;

    async fn seeded_store() -> (SqliteAccountStore, NamedTempFile, String) {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap().to_string();
        let store = SqliteAccountStore::new(&path).await.unwrap();

        for (owner, name) in [("u1", "Profile A"), ("u1", "Profile B"), ("u2", "Other")] {
            sqlx::query("INSERT INTO profiles (owner_user_id, display_name) VALUES (?, ?)")
                .bind(owner)
                .bind(name)
                .execute(&store.pool)
                .await
                .unwrap();
        }
        for id in ["u1", "u2"] {
            sqlx::query("INSERT INTO users_private (id, phone) VALUES (?, '0500000000')")
                .bind(id)
                .execute(&store.pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO auth_identities (user_id, email) VALUES (?, 'x@example.com')")
                .bind(id)
                .execute(&store.pool)
                .await
                .unwrap();
        }

        (store, tmp, path)
    }

    async fn count(store: &SqliteAccountStore, sql: &str, id: &str) -> i64 {
        sqlx::query(sql)
            .bind(id)
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get::<i64, _>(0)
    }

    #[tokio::test]
    async fn test_delete_account_removes_only_that_user() {
        let (store, _tmp, path) = seeded_store().await;
        let service = AccountService::new(store);

        let report = service.delete_account("u1").await.unwrap();
        assert_eq!(report.profiles_removed, 2);
        assert_eq!(report.private_records_removed, 1);

        // Reopen the same file to check what's left
        let store = &SqliteAccountStore::new(&path).await.unwrap();
        let profiles = "SELECT COUNT(*) FROM profiles WHERE owner_user_id = ?";
        let identities = "SELECT COUNT(*) FROM auth_identities WHERE user_id = ?";
        assert_eq!(count(store, profiles, "u1").await, 0);
        assert_eq!(count(store, identities, "u1").await, 0);
        assert_eq!(count(store, profiles, "u2").await, 1);
        assert_eq!(count(store, identities, "u2").await, 1);
    }

    #[tokio::test]
    async fn test_deleting_unknown_user_is_not_an_error() {
        let (store, _tmp, _path) = seeded_store().await;

        assert_eq!(store.delete_profiles("nobody").await.unwrap(), 0);
        assert_eq!(store.delete_private_record("nobody").await.unwrap(), 0);
        assert!(store.delete_identity("nobody").await.is_ok());
    }
}
