//! Weekly plan commands

use serde::Serialize;

use crate::app::{AppError, AppState};
use crate::generator::ContentGenerator;
use crate::models::WorkoutPlan;
use crate::reminder::{Notifier, ReminderError};
use crate::request::{Generation, LoadState};
use crate::store::StorageBackend;
use crate::workout::HistoryEntry;

/// Everything the plan view renders on entry
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
  pub plan: Option<WorkoutPlan>,
  pub active_day: usize,
  pub load_state: LoadState,
}

pub async fn get_plan<B, G, N>(state: &AppState<B, G, N>) -> Result<PlanView, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  let plan = state
    .plan()
    .await
    .map_err(|e| format!("Failed to load workout plan: {}", e))?;

  Ok(PlanView {
    plan,
    active_day: state.today_index(),
    load_state: state.workouts().requests().state(),
  })
}

/// Generate and store a new plan. `None` means nothing new was produced and
/// the previous plan is still in place.
pub async fn generate_plan<B, G, N>(state: &AppState<B, G, N>) -> Result<Option<WorkoutPlan>, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  match state.generate_plan().await {
    Ok(Generation::Produced(plan)) => Ok(Some(plan)),
    Ok(Generation::Unavailable | Generation::Superseded) => Ok(None),
    Err(AppError::NotOnboarded) => Err("Complete your profile first".to_string()),
    Err(e) => Err(format!("Failed to save workout plan: {}", e)),
  }
}

pub async fn toggle_exercise<B, G, N>(
  state: &AppState<B, G, N>,
  day_index: usize,
  exercise_index: usize,
) -> Result<WorkoutPlan, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state
    .toggle_exercise(day_index, exercise_index)
    .await
    .map_err(|e| format!("Failed to update exercise: {}", e))
}

pub async fn get_history<B, G, N>(state: &AppState<B, G, N>) -> Result<Vec<HistoryEntry>, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state
    .history()
    .await
    .map_err(|e| format!("Failed to load history: {}", e))
}

/// Arm the reminder for `day_index`, returning the confirmation shown to the user
pub async fn set_reminder<B, G, N>(state: &AppState<B, G, N>, day_index: usize) -> Result<String, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  match state.schedule_reminder(day_index).await {
    Ok(()) => Ok("Reminder set! You'll get a notification if today's workout isn't finished.".to_string()),
    Err(ReminderError::Unsupported) => Err("This device does not support notifications.".to_string()),
    Err(ReminderError::PermissionDenied) => Err("Notifications are blocked. Enable them to get reminders.".to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::save_profile;
  use crate::commands::tests::test_state;
  use crate::test_utils::{mock_plan, mock_profile, ScriptedGenerator};

  #[tokio::test]
  async fn test_plan_view_without_plan() {
    let (state, _) = test_state(ScriptedGenerator::new()).await;
    let view = get_plan(&state).await.unwrap();

    assert_eq!(view.plan, None);
    assert_eq!(view.active_day, 2);
    assert_eq!(view.load_state, LoadState::Idle);
  }

  #[tokio::test]
  async fn test_generate_before_onboarding_is_refused() {
    let (state, _) = test_state(ScriptedGenerator::new().with_plan(mock_plan())).await;
    assert_eq!(generate_plan(&state).await, Err("Complete your profile first".to_string()));
  }

  #[tokio::test]
  async fn test_failed_generation_reports_nothing_new() {
    let (state, _) = test_state(ScriptedGenerator::new()).await;
    save_profile(&state, mock_profile("Ana")).await.unwrap();

    assert_eq!(generate_plan(&state).await, Ok(None));
    assert_eq!(get_plan(&state).await.unwrap().load_state, LoadState::Failed);
  }

  #[tokio::test]
  async fn test_toggle_out_of_range_is_reported() {
    let (state, _) = test_state(ScriptedGenerator::new().with_plan(mock_plan())).await;
    save_profile(&state, mock_profile("Ana")).await.unwrap();
    generate_plan(&state).await.unwrap();

    let err = toggle_exercise(&state, 0, 5).await.unwrap_err();
    assert!(err.contains("out of range"), "{}", err);

    let plan = toggle_exercise(&state, 0, 0).await.unwrap();
    assert!(plan.split[0].exercises[0].completed);
    assert_eq!(get_history(&state).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_set_reminder_confirms() {
    let (state, _) = test_state(ScriptedGenerator::new()).await;
    let message = set_reminder(&state, 0).await.unwrap();
    assert!(message.starts_with("Reminder set!"));
    assert_eq!(state.reminders().armed_day(), Some(0));
  }
}
