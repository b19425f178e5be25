//! Cross-context profile sync
//!
//! Watches the storage scope for PROFILE writes made by other contexts and
//! republishes them as this context's local profile state. Only PROFILE is
//! propagated; workout and devotional edits in another context are picked up
//! on the next read.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::UserProfile;
use crate::store::{ContextId, StorageEvent, StorageKey};

/// Background task feeding a `watch` channel. Stops when dropped.
pub struct SyncListener {
  profile: watch::Receiver<Option<UserProfile>>,
  task: JoinHandle<()>,
}

impl SyncListener {
  /// Start listening on `events` on behalf of context `own`.
  ///
  /// `profile_state` is the context's local profile cell; the listener only
  /// ever writes parsed profiles into it.
  pub fn spawn(
    own: ContextId,
    events: broadcast::Receiver<StorageEvent>,
    profile_state: Arc<watch::Sender<Option<UserProfile>>>,
  ) -> Self {
    let profile = profile_state.subscribe();
    let task = tokio::spawn(run(own, events, profile_state));
    Self { profile, task }
  }

  /// Local profile state, updated by remote PROFILE writes
  pub fn profile(&self) -> watch::Receiver<Option<UserProfile>> {
    self.profile.clone()
  }

  pub fn is_running(&self) -> bool {
    !self.task.is_finished()
  }
}

impl Drop for SyncListener {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn run(
  own: ContextId,
  mut events: broadcast::Receiver<StorageEvent>,
  profile_state: Arc<watch::Sender<Option<UserProfile>>>,
) {
  loop {
    match events.recv().await {
      Ok(event) => {
        if event.origin == own {
          continue;
        }
        if let Some(profile) = profile_from_event(&event) {
          debug!(name = %profile.name, "Profile updated by another context");
          profile_state.send_replace(Some(profile));
        }
      }
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        warn!(skipped, "Sync listener lagged behind storage events");
      }
      Err(broadcast::error::RecvError::Closed) => {
        debug!("Storage scope closed, sync listener stopping");
        break;
      }
    }
  }
}

/// Parsed profile carried by a PROFILE event with a non-empty new value
fn profile_from_event(event: &StorageEvent) -> Option<UserProfile> {
  if event.key != StorageKey::Profile {
    return None;
  }
  let raw = event.new_value.as_deref().filter(|raw| !raw.is_empty())?;

  match serde_json::from_str::<UserProfile>(raw) {
    Ok(profile) => Some(profile),
    Err(e) => {
      warn!(error = %e, "Ignoring malformed profile from another context");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, PersistedStore};
  use crate::test_utils::memory_store;
  use std::time::Duration;

  fn listen(tab: &PersistedStore<MemoryStore>) -> (SyncListener, watch::Receiver<Option<UserProfile>>) {
    let (state, _) = watch::channel(None);
    let listener = SyncListener::spawn(tab.context(), tab.subscribe(), Arc::new(state));
    let profile = listener.profile();
    (listener, profile)
  }

  async fn next_profile(profile: &mut watch::Receiver<Option<UserProfile>>) -> Option<UserProfile> {
    tokio::time::timeout(Duration::from_secs(1), profile.changed())
      .await
      .expect("no profile propagated")
      .unwrap();
    profile.borrow_and_update().clone()
  }

  #[tokio::test]
  async fn test_profile_from_other_context_is_published() {
    let tab_a = memory_store();
    let tab_b = tab_a.open_context();
    let (_listener, mut profile) = listen(&tab_b);

    tab_a
      .write(StorageKey::Profile, r#"{"name":"Ana","goals":["loss"]}"#)
      .await
      .unwrap();

    let seen = next_profile(&mut profile).await.unwrap();
    assert_eq!(seen.name, "Ana");
    assert!(seen.goals.contains("loss"));
  }

  #[tokio::test]
  async fn test_own_writes_and_other_keys_are_ignored() {
    let tab_a = memory_store();
    let tab_b = tab_a.open_context();
    let (_listener, mut profile) = listen(&tab_b);

    tab_b.write(StorageKey::Profile, r#"{"name":"Self"}"#).await.unwrap();
    tab_a.write(StorageKey::Workout, "{}").await.unwrap();
    tab_a.write(StorageKey::Profile, r#"{"name":"Remote"}"#).await.unwrap();

    // The first change observed is the remote profile
    let seen = next_profile(&mut profile).await.unwrap();
    assert_eq!(seen.name, "Remote");
  }

  #[tokio::test]
  async fn test_malformed_profile_is_ignored() {
    let tab_a = memory_store();
    let tab_b = tab_a.open_context();
    let (listener, mut profile) = listen(&tab_b);

    tab_a.write(StorageKey::Profile, "{broken").await.unwrap();
    tab_a.write(StorageKey::Profile, r#"{"name":"Ana"}"#).await.unwrap();

    let seen = next_profile(&mut profile).await.unwrap();
    assert_eq!(seen.name, "Ana");
    assert!(listener.is_running());
  }

  #[test]
  fn test_removal_event_carries_no_profile() {
    let tab = memory_store();
    let event = StorageEvent {
      key: StorageKey::Profile,
      old_value: Some(r#"{"name":"Ana"}"#.to_string()),
      new_value: None,
      origin: tab.context(),
    };
    assert!(profile_from_event(&event).is_none());
  }
}
