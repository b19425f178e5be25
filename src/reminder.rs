//! Deferred workout reminders
//!
//! A reminder is a one-shot timer. When it fires it re-reads the stored plan
//! (never a copy captured at arm time) and notifies only if the target day is
//! still incomplete. Cancelling, or dropping the handle, guarantees that
//! nothing fires afterwards.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::profile::ProfileRepository;
use crate::store::StorageBackend;
use crate::workout::WorkoutTracker;

const REMINDER_TITLE: &str = "Performance AI - Workout Reminder";
const REMINDER_TAG: &str = "workout-reminder";

/// ---------------------------------------------------------------------------
/// Notification Capability
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  /// Not asked yet
  Default,
  Granted,
  Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  /// Notifications sharing a tag replace each other
  pub tag: String,
}

pub trait Notifier: Send + Sync + 'static {
  fn is_supported(&self) -> bool;

  fn permission_state(&self) -> Permission;

  fn request_permission(&self) -> impl Future<Output = Permission> + Send;

  fn notify(&self, notification: Notification);
}

/// Notifier that writes notifications to the log. Permission is granted on
/// first request.
#[derive(Debug)]
pub struct LogNotifier {
  permission: Mutex<Permission>,
}

impl Default for LogNotifier {
  fn default() -> Self {
    Self {
      permission: Mutex::new(Permission::Default),
    }
  }
}

impl Notifier for LogNotifier {
  fn is_supported(&self) -> bool {
    true
  }

  fn permission_state(&self) -> Permission {
    *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
  }

  async fn request_permission(&self) -> Permission {
    let mut permission = self.permission.lock().unwrap_or_else(PoisonError::into_inner);
    *permission = Permission::Granted;
    *permission
  }

  fn notify(&self, notification: Notification) {
    info!(
      title = %notification.title,
      tag = %notification.tag,
      "{}",
      notification.body
    );
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReminderError {
  #[error("Notifications are not supported on this platform")]
  Unsupported,

  #[error("Notification permission denied")]
  PermissionDenied,
}

/// ---------------------------------------------------------------------------
/// Timer Handle
/// ---------------------------------------------------------------------------

/// Shared cancellation flag, checked by callbacks before their side effect
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// One-shot deferred callback. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TimerHandle {
  cancelled: Arc<AtomicBool>,
  cancel_tx: Option<oneshot::Sender<()>>,
  task: JoinHandle<()>,
}

impl TimerHandle {
  pub fn arm<F, Fut>(delay: Duration, callback: F) -> Self
  where
    F: FnOnce(CancelToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let cancelled = Arc::new(AtomicBool::new(false));
    let token = CancelToken(Arc::clone(&cancelled));
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
      tokio::select! {
        _ = tokio::time::sleep(delay) => {
          if !token.is_cancelled() {
            callback(token).await;
          }
        }
        _ = cancel_rx => {}
      }
    });

    Self {
      cancelled,
      cancel_tx: Some(cancel_tx),
      task,
    }
  }

  pub fn cancel(&mut self) {
    self.cancelled.store(true, Ordering::SeqCst);
    if let Some(cancel_tx) = self.cancel_tx.take() {
      let _ = cancel_tx.send(());
    }
  }

  /// Armed and neither fired nor cancelled
  pub fn is_pending(&self) -> bool {
    !self.cancelled.load(Ordering::SeqCst) && !self.task.is_finished()
  }
}

impl Drop for TimerHandle {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// ---------------------------------------------------------------------------
/// Reminder Scheduler
/// ---------------------------------------------------------------------------

struct ArmedReminder {
  day_index: usize,
  timer: TimerHandle,
}

pub struct ReminderScheduler<B, N> {
  workouts: WorkoutTracker<B>,
  profiles: ProfileRepository<B>,
  notifier: Arc<N>,
  armed: Mutex<Option<ArmedReminder>>,
}

impl<B: StorageBackend, N: Notifier> ReminderScheduler<B, N> {
  pub fn new(workouts: WorkoutTracker<B>, profiles: ProfileRepository<B>, notifier: Arc<N>) -> Self {
    Self {
      workouts,
      profiles,
      notifier,
      armed: Mutex::new(None),
    }
  }

  /// Arm a check of `day_index` after `delay`, replacing any armed reminder.
  ///
  /// Permission is requested at most once per call, and only while it is
  /// still undecided. Without a grant the scheduler stays un-armed.
  pub async fn schedule_check(&self, day_index: usize, delay: Duration) -> Result<(), ReminderError> {
    if !self.notifier.is_supported() {
      return Err(ReminderError::Unsupported);
    }

    let mut permission = self.notifier.permission_state();
    if permission == Permission::Default {
      permission = self.notifier.request_permission().await;
    }
    if permission != Permission::Granted {
      info!(day_index, "Reminder not armed: notification permission denied");
      return Err(ReminderError::PermissionDenied);
    }

    let workouts = self.workouts.clone();
    let profiles = self.profiles.clone();
    let notifier = Arc::clone(&self.notifier);
    let timer = TimerHandle::arm(delay, move |token| async move {
      check_and_notify(&workouts, &profiles, notifier.as_ref(), day_index, &token).await;
    });

    self.install(ArmedReminder { day_index, timer });
    info!(day_index, delay_secs = delay.as_secs(), "Workout reminder armed");
    Ok(())
  }

  /// Day targeted by a still-pending reminder
  pub fn armed_day(&self) -> Option<usize> {
    let armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
    armed
      .as_ref()
      .filter(|reminder| reminder.timer.is_pending())
      .map(|reminder| reminder.day_index)
  }

  pub fn cancel(&self) {
    let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut reminder) = armed.take() {
      reminder.timer.cancel();
      debug!(day_index = reminder.day_index, "Workout reminder cancelled");
    }
  }

  /// Cancel only if the armed reminder targets `day_index`
  pub fn cancel_for_day(&self, day_index: usize) {
    let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut reminder) = armed.take_if(|reminder| reminder.day_index == day_index) {
      reminder.timer.cancel();
      debug!(day_index, "Workout reminder cancelled");
    }
  }

  fn install(&self, reminder: ArmedReminder) {
    let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
    // The replaced handle cancels itself on drop
    *armed = Some(reminder);
  }
}

async fn check_and_notify<B: StorageBackend, N: Notifier>(
  workouts: &WorkoutTracker<B>,
  profiles: &ProfileRepository<B>,
  notifier: &N,
  day_index: usize,
  token: &CancelToken,
) {
  let plan = match workouts.load_plan().await {
    Ok(Some(plan)) => plan,
    Ok(None) => {
      debug!(day_index, "Reminder fired without a stored plan");
      return;
    }
    Err(e) => {
      warn!(error = %e, "Reminder could not read the workout plan");
      return;
    }
  };

  let Some(day) = plan.day(day_index) else {
    warn!(day_index, "Reminder targets a day outside the plan");
    return;
  };

  if day.completed() {
    debug!(day_index, "Day already complete, no reminder");
    return;
  }

  let remaining = day.remaining();
  if remaining == 0 {
    return;
  }

  let name = match profiles.get().await {
    Ok(Some(profile)) => profile.name,
    _ => String::new(),
  };

  if token.is_cancelled() {
    return;
  }

  notifier.notify(reminder_notification(&name, remaining));
}

pub fn reminder_notification(name: &str, remaining: usize) -> Notification {
  let noun = if remaining == 1 { "exercise" } else { "exercises" };
  let greeting = if name.trim().is_empty() {
    "Focus!".to_string()
  } else {
    format!("Focus, {}!", name)
  };

  Notification {
    title: REMINDER_TITLE.to_string(),
    body: format!(
      "{} You still have {} {} left to finish today. Don't give up now.",
      greeting, remaining, noun
    ),
    tag: REMINDER_TAG.to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
