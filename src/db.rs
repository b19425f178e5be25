use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::store::StoreError;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
///
/// In-memory URLs get a single connection: every pooled connection to
/// `sqlite::memory:` would otherwise open its own isolated database.
pub async fn initialize_db(database_url: &str) -> Result<DbPool, StoreError> {
  info!(database_url, "Initializing database");

  let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
