use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Sqlite-backed store for the watchlist and per-stock notes.
///
/// Both tables are keyed by ticker code with last-write-wins semantics; there
/// is no concurrent writer, so no transactions are needed.
#[derive(Clone)]
pub struct WatchlistStore {
    pool: SqlitePool,
}

impl WatchlistStore {
    /// Open (or create) the store at the given path.
    pub async fn new(database_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                code TEXT PRIMARY KEY,
                added_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                code TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Watchlist store ready at {}", database_path);
        Ok(Self { pool })
    }

    /// Add a code to the watchlist. Adding an existing code is a no-op.
    pub async fn add(&self, code: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO watchlist (code) VALUES (?)")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, code: &str) -> Result<()> {
        sqlx::query("DELETE FROM watchlist WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn contains(&self, code: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM watchlist WHERE code = ?")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    /// All watched codes, oldest first.
    pub async fn codes(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT code FROM watchlist ORDER BY added_at, code")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("code"))
            .collect())
    }

    /// Store the note for a code, replacing any previous body.
    pub async fn set_note(&self, code: &str, body: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notes (code, body, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(code) DO UPDATE SET
                body = excluded.body,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(code)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn note(&self, code: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT body FROM notes WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("body")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store() -> (tempfile::TempDir, WatchlistStore) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let store = WatchlistStore::new(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn add_remove_and_contains() {
        let (_dir, store) = store().await;

        store.add("GARAN").await.unwrap();
        store.add("GARAN").await.unwrap(); // idempotent
        store.add("THYAO").await.unwrap();

        assert!(store.contains("GARAN").await.unwrap());
        assert_eq!(store.codes().await.unwrap().len(), 2);

        store.remove("GARAN").await.unwrap();
        assert!(!store.contains("GARAN").await.unwrap());
        assert_eq!(store.codes().await.unwrap(), vec!["THYAO".to_string()]);
    }

    #[tokio::test]
    async fn notes_are_last_write_wins() {
        let (_dir, store) = store().await;

        assert_eq!(store.note("GARAN").await.unwrap(), None);

        store.set_note("GARAN", "first draft").await.unwrap();
        store.set_note("GARAN", "second draft").await.unwrap();

        assert_eq!(
            store.note("GARAN").await.unwrap(),
            Some("second draft".to_string())
        );
    }
}
