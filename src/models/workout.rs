use serde::{Deserialize, Serialize};

/// Day slots in a weekly plan, index-addressed Monday = 0 ... Sunday = 6
pub const DAYS_PER_WEEK: usize = 7;

pub const WEEK_DAYS: [&str; DAYS_PER_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub name: String,
  #[serde(default)]
  pub sets: String,
  #[serde(default)]
  pub reps: String,
  #[serde(default)]
  pub notes: String,
  /// Search term for a technique video
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_search_term: Option<String>,
  #[serde(default)]
  pub completed: bool,
}

impl Exercise {
  pub fn new(name: impl Into<String>, sets: impl Into<String>, reps: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      sets: sets.into(),
      reps: reps.into(),
      notes: String::new(),
      video_search_term: None,
      completed: false,
    }
  }

  /// Video search query, falling back to the exercise name
  pub fn video_query(&self) -> String {
    match self.video_search_term.as_deref().map(str::trim) {
      Some(term) if !term.is_empty() => term.to_string(),
      _ => format!("{} proper form", self.name),
    }
  }
}

/// Completion state of a day, derived from its exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
  /// Nothing scheduled (rest day)
  NoPlanForDay,
  InProgress,
  Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
  pub day_name: String,
  pub focus: String,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
  /// Serialized cache of `completed()`; refreshed by `recompute`, never trusted on read
  #[serde(default)]
  completed: bool,
}

impl WorkoutDay {
  pub fn new(day_name: impl Into<String>, focus: impl Into<String>, exercises: Vec<Exercise>) -> Self {
    let mut day = Self {
      day_name: day_name.into(),
      focus: focus.into(),
      exercises,
      completed: false,
    };
    day.recompute();
    day
  }

  /// True iff the day has exercises and every one of them is done
  pub fn completed(&self) -> bool {
    !self.exercises.is_empty() && self.exercises.iter().all(|e| e.completed)
  }

  /// Refresh the serialized flag from the exercise list
  pub fn recompute(&mut self) {
    self.completed = self.completed();
  }

  /// The flag as last serialized, which may be stale for records from disk
  pub fn cached_completed(&self) -> bool {
    self.completed
  }

  pub fn total(&self) -> usize {
    self.exercises.len()
  }

  pub fn done(&self) -> usize {
    self.exercises.iter().filter(|e| e.completed).count()
  }

  pub fn remaining(&self) -> usize {
    self.total() - self.done()
  }

  /// Percent complete, rounded to the nearest integer. Rest days report 0.
  pub fn progress(&self) -> u8 {
    let total = self.total();
    if total == 0 {
      return 0;
    }
    ((self.done() as f64 / total as f64) * 100.0).round() as u8
  }

  pub fn status(&self) -> DayStatus {
    if self.exercises.is_empty() {
      DayStatus::NoPlanForDay
    } else if self.completed() {
      DayStatus::Complete
    } else {
      DayStatus::InProgress
    }
  }
}

/// The active weekly plan. `split` holds exactly seven days when it comes
/// from the generator; see `WorkoutPlan::validate_shape`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub split: Vec<WorkoutDay>,
}

impl WorkoutPlan {
  pub fn day(&self, index: usize) -> Option<&WorkoutDay> {
    self.split.get(index)
  }

  /// Refresh every day's cached completion flag
  pub fn recompute_all(&mut self) {
    for day in &mut self.split {
      day.recompute();
    }
  }
}
