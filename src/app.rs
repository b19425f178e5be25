//! Per-context application state
//!
//! One `AppState` is one open tab: it owns the in-memory tier (chat sessions,
//! the local profile cell, the armed reminder) and handles onto the shared
//! durable tier. Several states may share one storage scope.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::backup::{BackupError, BackupService};
use crate::chat::{ChatError, SessionRegistry};
use crate::clock::Clock;
use crate::devotional::DevotionalCache;
use crate::generator::ContentGenerator;
use crate::models::{DevotionalContent, Message, Persona, UserProfile, WorkoutPlan};
use crate::profile::ProfileRepository;
use crate::reminder::{Notifier, ReminderError, ReminderScheduler};
use crate::request::Generation;
use crate::store::{ContextId, PersistedStore, StorageBackend, StorageKey, StoreError};
use crate::sync::SyncListener;
use crate::workout::{today_index, HistoryEntry, WorkoutError, WorkoutTracker};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("Complete onboarding before generating a plan")]
  NotOnboarded,

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Workout(#[from] WorkoutError),

  #[error(transparent)]
  Backup(#[from] BackupError),

  #[error(transparent)]
  Reminder(#[from] ReminderError),

  #[error(transparent)]
  Chat(#[from] ChatError),
}

pub struct AppState<B, G, N> {
  store: PersistedStore<B>,
  profiles: ProfileRepository<B>,
  profile_state: Arc<watch::Sender<Option<UserProfile>>>,
  workouts: WorkoutTracker<B>,
  devotional: DevotionalCache<B>,
  backups: BackupService<B>,
  reminders: ReminderScheduler<B, N>,
  chat: SessionRegistry,
  generator: Arc<G>,
  clock: Arc<dyn Clock>,
  reminder_delay: Duration,
  _sync: SyncListener,
}

impl<B: StorageBackend, G: ContentGenerator, N: Notifier> AppState<B, G, N> {
  /// Attach a context to `store`, hydrate the profile and start listening
  /// for profile edits made by other contexts.
  pub async fn open(
    store: PersistedStore<B>,
    generator: Arc<G>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    reminder_delay: Duration,
  ) -> Result<Self, StoreError> {
    // Subscribe before the first read so no remote write slips between them
    let events = store.subscribe();

    let profiles = ProfileRepository::new(store.clone());
    let workouts = WorkoutTracker::new(store.clone());
    let profile = profiles.get().await?;
    let (profile_state, _) = watch::channel(profile);
    let profile_state = Arc::new(profile_state);

    let sync = SyncListener::spawn(store.context(), events, Arc::clone(&profile_state));

    info!(context = ?store.context(), onboarded = profile_state.borrow().is_some(), "Context opened");

    Ok(Self {
      devotional: DevotionalCache::new(store.clone(), Arc::clone(&clock)),
      backups: BackupService::new(store.clone(), Arc::clone(&clock)),
      reminders: ReminderScheduler::new(workouts.clone(), profiles.clone(), notifier),
      chat: SessionRegistry::new(Arc::clone(&clock)),
      store,
      profiles,
      profile_state,
      workouts,
      generator,
      clock,
      reminder_delay,
      _sync: sync,
    })
  }

  pub fn context(&self) -> ContextId {
    self.store.context()
  }

  // ---------------------------------------------------------------------------
  // Profile
  // ---------------------------------------------------------------------------

  pub fn profile(&self) -> Option<UserProfile> {
    self.profile_state.borrow().clone()
  }

  pub fn subscribe_profile(&self) -> watch::Receiver<Option<UserProfile>> {
    self.profile_state.subscribe()
  }

  pub fn is_onboarded(&self) -> bool {
    self.profile_state.borrow().is_some()
  }

  pub async fn save_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
    self.profiles.set(&profile).await?;
    self.profile_state.send_replace(Some(profile));
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Workout Plan
  // ---------------------------------------------------------------------------

  pub fn workouts(&self) -> &WorkoutTracker<B> {
    &self.workouts
  }

  pub async fn plan(&self) -> Result<Option<WorkoutPlan>, StoreError> {
    self.workouts.load_plan().await
  }

  pub async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
    Ok(self.plan().await?.map(|plan| plan.history()).unwrap_or_default())
  }

  /// Day the plan view opens on
  pub fn today_index(&self) -> usize {
    today_index(self.clock.as_ref())
  }

  pub async fn generate_plan(&self) -> Result<Generation<WorkoutPlan>, AppError> {
    let profile = self.profile().ok_or(AppError::NotOnboarded)?;
    Ok(self.workouts.regenerate_plan(self.generator.as_ref(), &profile).await?)
  }

  /// Toggle one exercise. Completing the day disarms its reminder.
  pub async fn toggle_exercise(&self, day_index: usize, exercise_index: usize) -> Result<WorkoutPlan, AppError> {
    let plan = self.workouts.toggle_exercise(day_index, exercise_index).await?;
    if plan.day(day_index).is_some_and(|day| day.completed()) {
      self.reminders.cancel_for_day(day_index);
    }
    Ok(plan)
  }

  // ---------------------------------------------------------------------------
  // Reminders
  // ---------------------------------------------------------------------------

  pub fn reminders(&self) -> &ReminderScheduler<B, N> {
    &self.reminders
  }

  /// Arm a reminder for `day_index` after the configured delay
  pub async fn schedule_reminder(&self, day_index: usize) -> Result<(), ReminderError> {
    self.reminders.schedule_check(day_index, self.reminder_delay).await
  }

  pub fn cancel_reminder(&self) {
    self.reminders.cancel();
  }

  // ---------------------------------------------------------------------------
  // Generated Content
  // ---------------------------------------------------------------------------

  pub fn devotional_cache(&self) -> &DevotionalCache<B> {
    &self.devotional
  }

  pub async fn devotional(&self) -> Result<Generation<DevotionalContent>, StoreError> {
    let profile = self.profile();
    self.devotional.load_or_refresh(self.generator.as_ref(), profile.as_ref()).await
  }

  pub async fn refresh_devotional(&self) -> Result<Generation<DevotionalContent>, StoreError> {
    let profile = self.profile();
    self.devotional.refresh(self.generator.as_ref(), profile.as_ref()).await
  }

  pub async fn daily_tip(&self) -> String {
    let profile = self.profile();
    self.generator.daily_tip(profile.as_ref()).await
  }

  // ---------------------------------------------------------------------------
  // Chat
  // ---------------------------------------------------------------------------

  pub fn transcript(&self, persona: Persona) -> Vec<Message> {
    self.chat.transcript(persona)
  }

  pub async fn send_message(&self, persona: Persona, text: &str) -> Result<Message, ChatError> {
    let profile = self.profile();
    self.chat.send(persona, text, self.generator.as_ref(), profile.as_ref()).await
  }

  // ---------------------------------------------------------------------------
  // Backup
  // ---------------------------------------------------------------------------

  pub async fn export_backup(&self) -> Result<String, BackupError> {
    self.backups.export().await
  }

  pub fn backup_file_name(&self) -> String {
    self.backups.file_name()
  }

  /// Restore a backup and rebuild every in-memory view from storage
  pub async fn restore_backup(&self, document: &str) -> Result<Vec<StorageKey>, AppError> {
    let keys = self.backups.import_document(document).await?;
    if let Err(e) = self.rehydrate().await {
      error!(error = %e, "Rehydration after restore failed");
      return Err(e.into());
    }
    Ok(keys)
  }

  /// Drop in-memory state as a cold start would and re-read what is persisted
  pub async fn rehydrate(&self) -> Result<(), StoreError> {
    self.reminders.cancel();
    self.workouts.requests().invalidate();
    self.devotional.requests().invalidate();
    self.chat.reset();

    let profile = self.profiles.get().await?;
    self.profile_state.send_replace(profile);

    info!(context = ?self.context(), "State rehydrated from storage");
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
