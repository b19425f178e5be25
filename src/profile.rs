//! Typed access to the stored user profile

use tracing::warn;

use crate::models::UserProfile;
use crate::store::{PersistedStore, StorageBackend, StorageKey, StoreError};

/// Parse a raw PROFILE value. Corrupt content is `None`, never an error.
pub fn parse_profile(raw: &str) -> Option<UserProfile> {
  match serde_json::from_str(raw) {
    Ok(profile) => Some(profile),
    Err(e) => {
      warn!(error = %e, "Stored profile is malformed, treating as absent");
      None
    }
  }
}

pub struct ProfileRepository<B> {
  store: PersistedStore<B>,
}

impl<B> Clone for ProfileRepository<B> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
    }
  }
}

impl<B: StorageBackend> ProfileRepository<B> {
  pub fn new(store: PersistedStore<B>) -> Self {
    Self { store }
  }

  /// `None` means the user has not onboarded (or the record is unreadable)
  pub async fn get(&self) -> Result<Option<UserProfile>, StoreError> {
    let raw = self.store.read(StorageKey::Profile).await?;
    Ok(raw.as_deref().and_then(parse_profile))
  }

  /// Replace the whole record
  pub async fn set(&self, profile: &UserProfile) -> Result<(), StoreError> {
    let raw = serde_json::to_string(profile)?;
    self.store.write(StorageKey::Profile, raw).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use crate::test_utils::mock_profile;

  fn repository() -> ProfileRepository<MemoryStore> {
    ProfileRepository::new(PersistedStore::new(MemoryStore::new()))
  }

  #[tokio::test]
  async fn test_absent_profile_means_not_onboarded() {
    assert_eq!(repository().get().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_set_then_get_returns_profile() {
    let repo = repository();
    let profile = mock_profile("Ana");
    repo.set(&profile).await.unwrap();

    assert_eq!(repo.get().await.unwrap(), Some(profile));
  }

  #[tokio::test]
  async fn test_set_replaces_whole_record() {
    let repo = repository();
    let mut profile = mock_profile("Ana");
    profile.medical_conditions = "asthma".to_string();
    repo.set(&profile).await.unwrap();

    let replacement = mock_profile("Bia");
    repo.set(&replacement).await.unwrap();

    let stored = repo.get().await.unwrap().unwrap();
    assert_eq!(stored.name, "Bia");
    assert_eq!(stored.medical_conditions, "");
  }

  #[tokio::test]
  async fn test_corrupt_json_reads_as_absent() {
    let store = PersistedStore::new(MemoryStore::new());
    store.write(StorageKey::Profile, "{not json").await.unwrap();

    let repo = ProfileRepository::new(store);
    assert_eq!(repo.get().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_write_failure_surfaces() {
    let store = PersistedStore::new(MemoryStore::new());
    store.backend().set_unavailable(true);

    let repo = ProfileRepository::new(store);
    assert!(repo.set(&mock_profile("Ana")).await.is_err());
  }
}
