//! SQLite backend over the shared sqlx pool

use chrono::Utc;

use super::{StorageBackend, StorageKey, StoreError};
use crate::db::DbPool;

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }
}

impl StorageBackend for SqliteStore {
  async fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
      .bind(key.as_str())
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  async fn put_all(&self, entries: &[(StorageKey, String)]) -> Result<Vec<Option<String>>, StoreError> {
    let updated_at = Utc::now().to_rfc3339();
    let mut tx = self.pool.begin().await?;
    let mut previous = Vec::with_capacity(entries.len());

    for (key, value) in entries {
      let old_value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
        .bind(key.as_str())
        .fetch_optional(&mut *tx)
        .await?;

      sqlx::query(
        r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
          value = excluded.value,
          updated_at = excluded.updated_at
        "#,
      )
      .bind(key.as_str())
      .bind(value.as_str())
      .bind(updated_at.as_str())
      .execute(&mut *tx)
      .await?;

      previous.push(old_value);
    }

    tx.commit().await?;
    Ok(previous)
  }

  async fn delete(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    let mut tx = self.pool.begin().await?;

    let old_value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
      .bind(key.as_str())
      .fetch_optional(&mut *tx)
      .await?;

    sqlx::query("DELETE FROM kv_store WHERE key = ?1")
      .bind(key.as_str())
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(old_value)
  }

  async fn usage_bytes(&self) -> Result<usize, StoreError> {
    let bytes: i64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) FROM kv_store",
    )
    .fetch_one(&self.pool)
    .await?;
    Ok(usize::try_from(bytes).unwrap_or_default())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
