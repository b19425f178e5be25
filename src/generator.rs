//! Content generator boundary
//!
//! Read-through calls (chat replies, the dashboard tip) fail open with a fixed
//! string so the UI never blocks. State-creating calls (plans, devotionals)
//! fail closed with `None`, leaving whatever was stored before untouched.

use std::future::Future;

use crate::models::{DevotionalContent, Message, Persona, UserProfile, WorkoutPlan};

pub const CHAT_ERROR_REPLY: &str = "Sorry, something went wrong while processing your request.";
pub const CHAT_EMPTY_REPLY: &str = "I couldn't generate a response right now.";
pub const MISSING_KEY_REPLY: &str = "Error: API key not configured.";
pub const TIP_FALLBACK: &str = "Push past your limits today.";
pub const TIP_EMPTY: &str = "Stay focused.";
pub const TIP_MISSING_KEY: &str = "Set up your API key.";

pub trait ContentGenerator: Send + Sync + 'static {
  /// Reply to `message` given the transcript that preceded it. Never fails.
  fn converse(
    &self,
    message: &str,
    transcript: &[Message],
    persona: Persona,
    profile: Option<&UserProfile>,
  ) -> impl Future<Output = String> + Send;

  /// One short motivational line. Never fails.
  fn daily_tip(&self, profile: Option<&UserProfile>) -> impl Future<Output = String> + Send;

  fn generate_plan(&self, profile: &UserProfile) -> impl Future<Output = Option<WorkoutPlan>> + Send;

  fn generate_devotional(
    &self,
    profile: Option<&UserProfile>,
  ) -> impl Future<Output = Option<DevotionalContent>> + Send;
}
