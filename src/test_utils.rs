//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - A controllable clock
//! - Scripted stand-ins for the content generator and notifier

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;
use tokio::sync::Notify;

use crate::clock::Clock;
use crate::generator::ContentGenerator;
use crate::models::{
  ActivityLevel, DevotionalContent, Exercise, Gender, Message, Persona, UserProfile, WorkoutDay, WorkoutPlan,
};
use crate::reminder::{Notification, Notifier, Permission};
use crate::store::{MemoryStore, PersistedStore};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Fresh in-memory storage scope with no quota
pub fn memory_store() -> PersistedStore<MemoryStore> {
  PersistedStore::new(MemoryStore::new())
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_profile(name: &str) -> UserProfile {
  UserProfile {
    name: name.to_string(),
    age: "29".to_string(),
    gender: Gender::Female,
    weight: "61".to_string(),
    height: "168".to_string(),
    activity_level: ActivityLevel::Intense,
    goals: ["Hypertrophy".to_string(), "Focus".to_string()].into_iter().collect(),
    dietary_restrictions: "lactose".to_string(),
    medical_conditions: String::new(),
  }
}

/// Seven-day plan, nothing completed.
///
/// Exercise counts per day: Mon 2, Tue 3, Wed 0 (rest), Thu 2, Fri 3,
/// Sat 1, Sun 0 (rest).
pub fn mock_plan() -> WorkoutPlan {
  WorkoutPlan {
    title: "Strength Foundations".to_string(),
    description: "Four lifting days with active recovery".to_string(),
    split: vec![
      WorkoutDay::new(
        "Monday",
        "Lower Body",
        vec![Exercise::new("Back Squat", "4", "8"), Exercise::new("Romanian Deadlift", "3", "10")],
      ),
      WorkoutDay::new(
        "Tuesday",
        "Upper Push",
        vec![
          Exercise::new("Bench Press", "4", "6"),
          Exercise::new("Overhead Press", "3", "8"),
          Exercise::new("Dips", "3", "12"),
        ],
      ),
      WorkoutDay::new("Wednesday", "Rest", vec![]),
      WorkoutDay::new(
        "Thursday",
        "Upper Pull",
        vec![Exercise::new("Pull Up", "4", "6"), Exercise::new("Barbell Row", "3", "10")],
      ),
      WorkoutDay::new(
        "Friday",
        "Full Body",
        vec![
          Exercise::new("Deadlift", "3", "5"),
          Exercise::new("Lunges", "3", "12"),
          Exercise::new("Plank", "3", "45s"),
        ],
      ),
      WorkoutDay::new("Saturday", "Conditioning", vec![Exercise::new("Rowing Intervals", "6", "500m")]),
      WorkoutDay::new("Sunday", "Rest", vec![]),
    ],
  }
}

pub fn mock_devotional() -> DevotionalContent {
  DevotionalContent {
    verse: "I can do all things through him who strengthens me.".to_string(),
    reference: "Philippians 4:13".to_string(),
    reflection: "Strength is built one repetition at a time.".to_string(),
    prayer: "Give me patience with the process.".to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Fixed Clock
/// ---------------------------------------------------------------------------

/// Clock pinned to a date until moved explicitly
#[derive(Debug)]
pub struct FixedClock {
  today: Mutex<NaiveDate>,
}

impl FixedClock {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      today: Mutex::new(today),
    }
  }

  pub fn set(&self, today: NaiveDate) {
    *self.today.lock().unwrap() = today;
  }

  pub fn advance_days(&self, days: i64) {
    let mut today = self.today.lock().unwrap();
    *today += Duration::days(days);
  }
}

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate {
    *self.today.lock().unwrap()
  }

  fn now(&self) -> DateTime<Utc> {
    let noon = self.today().and_hms_opt(12, 0, 0).unwrap();
    Utc.from_utc_datetime(&noon)
  }
}

/// ---------------------------------------------------------------------------
/// Scripted Content Generator
/// ---------------------------------------------------------------------------

struct Gate {
  called: Notify,
  release: Notify,
}

/// Generator returning canned content. A gated generator parks every call
/// until `release` so tests can interleave other work with an in-flight
/// request.
pub struct ScriptedGenerator {
  reply: String,
  tip: String,
  plan: Option<WorkoutPlan>,
  devotional: Option<DevotionalContent>,
  gate: Option<Gate>,
  calls: AtomicUsize,
  last_transcript_len: Mutex<Option<usize>>,
}

impl Default for ScriptedGenerator {
  fn default() -> Self {
    Self::new()
  }
}

impl ScriptedGenerator {
  pub fn new() -> Self {
    Self {
      reply: "Scripted reply".to_string(),
      tip: "Scripted tip".to_string(),
      plan: None,
      devotional: None,
      gate: None,
      calls: AtomicUsize::new(0),
      last_transcript_len: Mutex::new(None),
    }
  }

  pub fn with_reply(mut self, reply: &str) -> Self {
    self.reply = reply.to_string();
    self
  }

  pub fn with_plan(mut self, plan: WorkoutPlan) -> Self {
    self.plan = Some(plan);
    self
  }

  pub fn with_devotional(mut self, devotional: DevotionalContent) -> Self {
    self.devotional = Some(devotional);
    self
  }

  pub fn gated(mut self) -> Self {
    self.gate = Some(Gate {
      called: Notify::new(),
      release: Notify::new(),
    });
    self
  }

  /// Wait until a call has reached the gate
  pub async fn wait_for_call(&self) {
    if let Some(gate) = &self.gate {
      gate.called.notified().await;
    }
  }

  /// Let one parked call continue
  pub fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.release.notify_one();
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Length of the transcript handed to the most recent `converse`
  pub fn last_transcript_len(&self) -> Option<usize> {
    *self.last_transcript_len.lock().unwrap()
  }

  async fn pass_gate(&self) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      gate.called.notify_one();
      gate.release.notified().await;
    }
  }
}

impl ContentGenerator for ScriptedGenerator {
  async fn converse(
    &self,
    _message: &str,
    transcript: &[Message],
    _persona: Persona,
    _profile: Option<&UserProfile>,
  ) -> String {
    *self.last_transcript_len.lock().unwrap() = Some(transcript.len());
    self.pass_gate().await;
    self.reply.clone()
  }

  async fn daily_tip(&self, _profile: Option<&UserProfile>) -> String {
    self.pass_gate().await;
    self.tip.clone()
  }

  async fn generate_plan(&self, _profile: &UserProfile) -> Option<WorkoutPlan> {
    self.pass_gate().await;
    self.plan.clone()
  }

  async fn generate_devotional(&self, _profile: Option<&UserProfile>) -> Option<DevotionalContent> {
    self.pass_gate().await;
    self.devotional.clone()
  }
}

/// ---------------------------------------------------------------------------
/// Recording Notifier
/// ---------------------------------------------------------------------------

pub struct RecordingNotifier {
  supported: bool,
  permission: Mutex<Permission>,
  /// What the user answers when asked
  answer: Permission,
  requests: AtomicUsize,
  sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  fn with(supported: bool, permission: Permission, answer: Permission) -> Self {
    Self {
      supported,
      permission: Mutex::new(permission),
      answer,
      requests: AtomicUsize::new(0),
      sent: Mutex::new(Vec::new()),
    }
  }

  /// Permission already granted
  pub fn granted() -> Self {
    Self::with(true, Permission::Granted, Permission::Granted)
  }

  /// Permission undecided; the prompt resolves to `answer`
  pub fn answering(answer: Permission) -> Self {
    Self::with(true, Permission::Default, answer)
  }

  pub fn unsupported() -> Self {
    Self::with(false, Permission::Default, Permission::Denied)
  }

  pub fn sent(&self) -> Vec<Notification> {
    self.sent.lock().unwrap().clone()
  }

  pub fn permission_requests(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }
}

impl Notifier for RecordingNotifier {
  fn is_supported(&self) -> bool {
    self.supported
  }

  fn permission_state(&self) -> Permission {
    *self.permission.lock().unwrap()
  }

  async fn request_permission(&self) -> Permission {
    self.requests.fetch_add(1, Ordering::SeqCst);
    let mut permission = self.permission.lock().unwrap();
    *permission = self.answer;
    *permission
  }

  fn notify(&self, notification: Notification) {
    self.sent.lock().unwrap().push(notification);
  }
}
