//! UI-facing commands
//!
//! Each command takes the context's `AppState` and maps failures to the
//! user-facing strings the views display.

pub mod backup;
pub mod chat;
pub mod devotional;
pub mod workout;

use crate::app::AppState;
use crate::generator::ContentGenerator;
use crate::models::UserProfile;
use crate::reminder::Notifier;
use crate::store::StorageBackend;

/// ---------------------------------------------------------------------------
/// Profile Commands
/// ---------------------------------------------------------------------------

/// Current profile; `None` routes the user to onboarding
pub fn get_profile<B, G, N>(state: &AppState<B, G, N>) -> Option<UserProfile>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state.profile()
}

/// Save the onboarding form or a profile edit. The whole record is replaced.
pub async fn save_profile<B, G, N>(state: &AppState<B, G, N>, profile: UserProfile) -> Result<(), String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  if profile.name.trim().is_empty() {
    return Err("Name is required".to_string());
  }

  state
    .save_profile(profile)
    .await
    .map_err(|e| format!("Failed to save profile: {}", e))
}
