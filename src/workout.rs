//! Weekly Workout Plan State Machine
//!
//! Owns the persisted weekly plan (seven index-addressed day slots) and the
//! per-exercise completion toggle. Key rules:
//! - An exercise is either incomplete or complete; toggling flips exactly one
//! - A day is complete iff it has exercises and all of them are complete
//! - The day flag is derived and recomputed on every load and mutation
//! - Replacing a plan discards the previous one in full

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clock::{weekday_index, Clock};
use crate::generator::ContentGenerator;
use crate::models::workout::DAYS_PER_WEEK;
use crate::models::{UserProfile, WorkoutDay, WorkoutPlan};
use crate::request::{Generation, LoadState, RequestTracker};
use crate::store::{PersistedStore, StorageBackend, StorageKey, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
  #[error("No workout plan stored")]
  NoPlan,

  #[error("Day index {index} out of range (plan has {len} days)")]
  DayOutOfRange { index: usize, len: usize },

  #[error("Exercise index {index} out of range (day has {len} exercises)")]
  ExerciseOutOfRange { index: usize, len: usize },

  #[error("A weekly plan needs exactly 7 days, got {0}")]
  InvalidShape(usize),

  #[error(transparent)]
  Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Transitions and Projections
// ---------------------------------------------------------------------------

/// One row of the history view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
  pub day_index: usize,
  pub day_name: String,
  pub focus: String,
  pub progress: u8,
  pub done: usize,
  pub total: usize,
  pub completed: bool,
}

impl HistoryEntry {
  fn from_day(day_index: usize, day: &WorkoutDay) -> Self {
    Self {
      day_index,
      day_name: day.day_name.clone(),
      focus: day.focus.clone(),
      progress: day.progress(),
      done: day.done(),
      total: day.total(),
      completed: day.completed(),
    }
  }
}

impl WorkoutPlan {
  /// The seven-day contract, checked where plans enter the system
  pub fn validate_shape(&self) -> Result<(), WorkoutError> {
    if self.split.len() != DAYS_PER_WEEK {
      return Err(WorkoutError::InvalidShape(self.split.len()));
    }
    Ok(())
  }

  /// Flip one exercise and recompute its day. Returns the exercise's new state.
  pub fn toggle_exercise(&mut self, day_index: usize, exercise_index: usize) -> Result<bool, WorkoutError> {
    let len = self.split.len();
    let day = self
      .split
      .get_mut(day_index)
      .ok_or(WorkoutError::DayOutOfRange { index: day_index, len })?;

    let len = day.exercises.len();
    let exercise = day
      .exercises
      .get_mut(exercise_index)
      .ok_or(WorkoutError::ExerciseOutOfRange {
        index: exercise_index,
        len,
      })?;

    exercise.completed = !exercise.completed;
    let now_completed = exercise.completed;
    day.recompute();

    Ok(now_completed)
  }

  /// Days with any progress, in week order
  pub fn history(&self) -> Vec<HistoryEntry> {
    self
      .split
      .iter()
      .enumerate()
      .filter(|(_, day)| day.progress() > 0 || day.completed())
      .map(|(index, day)| HistoryEntry::from_day(index, day))
      .collect()
  }
}

/// Parse a raw WORKOUT value, refreshing every derived flag.
/// Corrupt content is `None`.
pub fn parse_plan(raw: &str) -> Option<WorkoutPlan> {
  match serde_json::from_str::<WorkoutPlan>(raw) {
    Ok(mut plan) => {
      plan.recompute_all();
      Some(plan)
    }
    Err(e) => {
      warn!(error = %e, "Stored workout plan is malformed, treating as absent");
      None
    }
  }
}

/// Default active day for the plan view
pub fn today_index(clock: &dyn Clock) -> usize {
  weekday_index(clock.today())
}

// ---------------------------------------------------------------------------
// Tracker (persisted state machine)
// ---------------------------------------------------------------------------

pub struct WorkoutTracker<B> {
  store: PersistedStore<B>,
  requests: RequestTracker,
  /// Serializes read-modify-write cycles on the stored plan
  write_lock: Arc<Mutex<()>>,
}

impl<B> Clone for WorkoutTracker<B> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      requests: self.requests.clone(),
      write_lock: Arc::clone(&self.write_lock),
    }
  }
}

impl<B: StorageBackend> WorkoutTracker<B> {
  pub fn new(store: PersistedStore<B>) -> Self {
    Self {
      store,
      requests: RequestTracker::new(),
      write_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Loading state of plan generation
  pub fn requests(&self) -> &RequestTracker {
    &self.requests
  }

  pub async fn load_plan(&self) -> Result<Option<WorkoutPlan>, StoreError> {
    let raw = self.store.read(StorageKey::Workout).await?;
    Ok(raw.as_deref().and_then(parse_plan))
  }

  /// Overwrite the stored plan. Shape is the caller's contract.
  pub async fn replace_plan(&self, mut plan: WorkoutPlan) -> Result<WorkoutPlan, StoreError> {
    plan.recompute_all();
    let raw = serde_json::to_string(&plan)?;
    let _guard = self.write_lock.lock().await;
    self.store.write(StorageKey::Workout, raw).await?;
    info!(title = %plan.title, "Workout plan replaced");
    Ok(plan)
  }

  pub async fn toggle_exercise(
    &self,
    day_index: usize,
    exercise_index: usize,
  ) -> Result<WorkoutPlan, WorkoutError> {
    let _guard = self.write_lock.lock().await;
    let mut plan = self.load_plan().await?.ok_or(WorkoutError::NoPlan)?;

    let now_completed = plan.toggle_exercise(day_index, exercise_index).map_err(|e| {
      error!(error = %e, day_index, exercise_index, "Exercise toggle outside plan shape");
      e
    })?;

    let raw = serde_json::to_string(&plan).map_err(StoreError::from)?;
    self.store.write(StorageKey::Workout, raw).await?;

    debug!(day_index, exercise_index, now_completed, "Exercise toggled");
    Ok(plan)
  }

  /// Ask the generator for a new plan; replaces the stored one only on success
  pub async fn regenerate_plan<G: ContentGenerator>(
    &self,
    generator: &G,
    profile: &UserProfile,
  ) -> Result<Generation<WorkoutPlan>, StoreError> {
    let ticket = self.requests.begin();
    let generated = generator.generate_plan(profile).await;

    if !self.requests.is_current(ticket) {
      debug!("Discarding superseded plan response");
      return Ok(Generation::Superseded);
    }

    let Some(plan) = generated.filter(|plan| match plan.validate_shape() {
      Ok(()) => true,
      Err(e) => {
        warn!(error = %e, "Generated plan rejected");
        false
      }
    }) else {
      self.requests.finish(ticket, LoadState::Failed);
      return Ok(Generation::Unavailable);
    };

    match self.replace_plan(plan).await {
      Ok(plan) => {
        self.requests.finish(ticket, LoadState::Succeeded);
        Ok(Generation::Produced(plan))
      }
      Err(e) => {
        self.requests.finish(ticket, LoadState::Failed);
        Err(e)
      }
    }
  }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
