//! In-memory backend, used by tests and as a throwaway scope

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::{StorageBackend, StorageKey, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<StorageKey, String>>,
  unavailable: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Simulate disabled storage: every operation fails until switched back
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  fn ensure_available(&self) -> Result<(), StoreError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(StoreError::Unavailable("storage is disabled".to_string()));
    }
    Ok(())
  }

  fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
  }

  fn get_sync(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    self.ensure_available()?;
    let entries = self.entries.read().map_err(|_| Self::poisoned())?;
    Ok(entries.get(&key).cloned())
  }

  fn put_all_sync(&self, batch: &[(StorageKey, String)]) -> Result<Vec<Option<String>>, StoreError> {
    self.ensure_available()?;
    let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
    Ok(
      batch
        .iter()
        .map(|(key, value)| entries.insert(*key, value.clone()))
        .collect(),
    )
  }

  fn delete_sync(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    self.ensure_available()?;
    let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
    Ok(entries.remove(&key))
  }

  fn usage_sync(&self) -> Result<usize, StoreError> {
    self.ensure_available()?;
    let entries = self.entries.read().map_err(|_| Self::poisoned())?;
    Ok(entries.iter().map(|(key, value)| key.footprint(value)).sum())
  }
}

impl StorageBackend for MemoryStore {
  async fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    self.get_sync(key)
  }

  async fn put_all(&self, entries: &[(StorageKey, String)]) -> Result<Vec<Option<String>>, StoreError> {
    self.put_all_sync(entries)
  }

  async fn delete(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
    self.delete_sync(key)
  }

  async fn usage_bytes(&self) -> Result<usize, StoreError> {
    self.usage_sync()
  }
}
