//! Persisted key/value store
//!
//! Durable storage keyed by a fixed set of logical names. Values are raw
//! strings; this layer does no schema validation. Every successful mutation
//! is broadcast to the other contexts sharing the same storage scope, the
//! same way a browser fires `storage` events into the other open tabs.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the mutation channel shared by all contexts of a scope
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// ---------------------------------------------------------------------------
/// Keys
/// ---------------------------------------------------------------------------

/// Fixed logical key set. The wire names match the web client so backups
/// written by either side restore into the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
  Profile,
  Workout,
  Devotional,
  DevotionalDate,
}

impl StorageKey {
  pub const ALL: [StorageKey; 4] = [
    StorageKey::Profile,
    StorageKey::Workout,
    StorageKey::Devotional,
    StorageKey::DevotionalDate,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Profile => "zenite_profile",
      Self::Workout => "zenite_workout_plan",
      Self::Devotional => "zenite_devotional",
      Self::DevotionalDate => "zenite_devotional_date",
    }
  }

  /// Bytes this entry occupies against the quota
  fn footprint(&self, value: &str) -> usize {
    self.as_str().len() + value.len()
  }
}

impl std::fmt::Display for StorageKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Storage unavailable: {0}")]
  Unavailable(String),

  #[error("Storage quota exceeded: {required} bytes needed, quota is {quota}")]
  QuotaExceeded { required: usize, quota: usize },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Failed to encode record: {0}")]
  Encode(#[from] serde_json::Error),
}

/// ---------------------------------------------------------------------------
/// Contexts and Mutation Events
/// ---------------------------------------------------------------------------

/// Identity of one execution context (a tab) attached to a storage scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
  fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }
}

/// A mutation observed on the shared scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
  pub key: StorageKey,
  pub old_value: Option<String>,
  pub new_value: Option<String>,
  pub origin: ContextId,
}

/// ---------------------------------------------------------------------------
/// Backend Interface
/// ---------------------------------------------------------------------------

/// Raw durable storage. Implementations must make `put_all` all-or-nothing.
pub trait StorageBackend: Send + Sync + 'static {
  fn get(&self, key: StorageKey) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

  /// Write every entry atomically, returning each key's previous value in order
  fn put_all(
    &self,
    entries: &[(StorageKey, String)],
  ) -> impl Future<Output = Result<Vec<Option<String>>, StoreError>> + Send;

  /// Remove a key, returning the value it held
  fn delete(&self, key: StorageKey) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

  /// Total key + value bytes currently stored
  fn usage_bytes(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// ---------------------------------------------------------------------------
/// Persisted Store
/// ---------------------------------------------------------------------------

/// Handle to a storage scope as seen from one context.
///
/// Clones share the context; `open_context` attaches a new one (another tab)
/// to the same backend and notification channel.
pub struct PersistedStore<B> {
  backend: Arc<B>,
  events: broadcast::Sender<StorageEvent>,
  context: ContextId,
  quota_bytes: Option<usize>,
}

impl<B> Clone for PersistedStore<B> {
  fn clone(&self) -> Self {
    Self {
      backend: Arc::clone(&self.backend),
      events: self.events.clone(),
      context: self.context,
      quota_bytes: self.quota_bytes,
    }
  }
}

impl<B: StorageBackend> PersistedStore<B> {
  pub fn new(backend: B) -> Self {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self {
      backend: Arc::new(backend),
      events,
      context: ContextId::next(),
      quota_bytes: None,
    }
  }

  /// Limit the scope to `quota` bytes. `None` means unlimited.
  pub fn with_quota(mut self, quota: Option<usize>) -> Self {
    self.quota_bytes = quota;
    self
  }

  pub fn open_context(&self) -> Self {
    Self {
      context: ContextId::next(),
      ..self.clone()
    }
  }

  pub fn context(&self) -> ContextId {
    self.context
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  /// Receive every mutation made on this scope, from any context
  pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
    self.events.subscribe()
  }

  pub async fn read(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    self.backend.get(key).await
  }

  pub async fn write(&self, key: StorageKey, value: impl Into<String>) -> Result<(), StoreError> {
    self.write_many(vec![(key, value.into())]).await
  }

  /// Write several keys as one unit: either all land or none do
  pub async fn write_many(&self, entries: Vec<(StorageKey, String)>) -> Result<(), StoreError> {
    if entries.is_empty() {
      return Ok(());
    }

    self.check_quota(&entries).await?;

    let previous = self.backend.put_all(&entries).await.map_err(|e| {
      warn!(error = %e, "Storage write failed");
      e
    })?;

    for ((key, value), old_value) in entries.into_iter().zip(previous) {
      self.publish(key, old_value, Some(value));
    }

    Ok(())
  }

  pub async fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
    let old_value = self.backend.delete(key).await?;
    if old_value.is_some() {
      self.publish(key, old_value, None);
    }
    Ok(())
  }

  pub async fn clear(&self) -> Result<(), StoreError> {
    for key in StorageKey::ALL {
      self.remove(key).await?;
    }
    Ok(())
  }

  async fn check_quota(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
    let Some(quota) = self.quota_bytes else {
      return Ok(());
    };

    let mut projected = self.backend.usage_bytes().await?;
    for (key, value) in entries {
      if let Some(existing) = self.backend.get(*key).await? {
        projected = projected.saturating_sub(key.footprint(&existing));
      }
      projected += key.footprint(value);
    }

    if projected > quota {
      warn!(required = projected, quota, "Storage quota exceeded");
      return Err(StoreError::QuotaExceeded {
        required: projected,
        quota,
      });
    }
    Ok(())
  }

  fn publish(&self, key: StorageKey, old_value: Option<String>, new_value: Option<String>) {
    if old_value == new_value {
      return;
    }
    debug!(%key, context = self.context.0, "Storage mutation");
    // No subscribers is fine: nobody else has the scope open.
    let _ = self.events.send(StorageEvent {
      key,
      old_value,
      new_value,
      origin: self.context,
    });
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
