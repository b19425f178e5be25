//! Devotional and dashboard tip commands

use crate::app::AppState;
use crate::generator::ContentGenerator;
use crate::models::DevotionalContent;
use crate::reminder::Notifier;
use crate::request::Generation;
use crate::store::StorageBackend;

/// Today's devotional, generated on first access of the day. `None` when the
/// generator produced nothing.
pub async fn get_devotional<B, G, N>(state: &AppState<B, G, N>) -> Result<Option<DevotionalContent>, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state
    .devotional()
    .await
    .map(Generation::produced)
    .map_err(|e| format!("Failed to load devotional: {}", e))
}

/// Discard today's entry and ask for a fresh one. The old entry survives a
/// failed generation.
pub async fn refresh_devotional<B, G, N>(state: &AppState<B, G, N>) -> Result<Option<DevotionalContent>, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state
    .refresh_devotional()
    .await
    .map(Generation::produced)
    .map_err(|e| format!("Failed to refresh devotional: {}", e))
}

pub async fn get_daily_tip<B, G, N>(state: &AppState<B, G, N>) -> String
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state.daily_tip().await
}
