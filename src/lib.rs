//! Zenite local state and sync layer
//!
//! [`launch`] builds the [`DesktopState`] for one context. Views talk to it
//! through [`commands`], the UI-facing API: every function there takes the
//! state and reports failures as display-ready strings. The other modules are
//! the layers those commands are built from.

pub mod app;
pub mod backup;
pub mod chat;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod devotional;
pub mod generator;
pub mod llm;
pub mod models;
pub mod profile;
pub mod reminder;
pub mod request;
pub mod store;
pub mod sync;
pub mod workout;

#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use app::AppState;
use clock::SystemClock;
use config::{AppConfig, ConfigError};
use llm::ClaudeGenerator;
use reminder::LogNotifier;
use store::{PersistedStore, SqliteStore, StoreError};

/// Application state of the desktop build
pub type DesktopState = AppState<SqliteStore, ClaudeGenerator, LogNotifier>;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
  #[error("Configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("Storage error: {0}")]
  Store(#[from] StoreError),
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// later calls are no-ops.
pub fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::new(
    std::env::var("RUST_LOG").unwrap_or_else(|_| "zenite_lib=info".into()),
  );

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer())
    .try_init();
}

/// Load configuration, open the database and attach the first context
pub async fn launch() -> Result<DesktopState, LaunchError> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_tracing();

  let config = AppConfig::from_env()?;
  let pool = db::initialize_db(&config.database_url).await?;
  let store = PersistedStore::new(SqliteStore::new(pool)).with_quota(config.storage_quota_bytes);

  let generator = Arc::new(ClaudeGenerator::from_config(&config));
  let state = AppState::open(
    store,
    generator,
    Arc::new(LogNotifier::default()),
    Arc::new(SystemClock),
    config.reminder_delay,
  )
  .await?;

  info!(onboarded = state.is_onboarded(), "Zenite ready");
  Ok(state)
}
