use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  #[default]
  Male,
  Female,
  Other,
}

impl std::fmt::Display for Gender {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Male => write!(f, "male"),
      Self::Female => write!(f, "female"),
      Self::Other => write!(f, "other"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
  Sedentary,
  Light,
  #[default]
  Moderate,
  Intense,
}

impl std::fmt::Display for ActivityLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Sedentary => write!(f, "sedentary"),
      Self::Light => write!(f, "light"),
      Self::Moderate => write!(f, "moderate"),
      Self::Intense => write!(f, "intense"),
    }
  }
}

/// The single on-device user profile. Saved wholesale, never patched.
///
/// Measurements stay as entered (strings) so records written by the web
/// onboarding form parse unchanged. Missing fields take onboarding defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
  pub name: String,
  pub age: String,
  pub gender: Gender,
  /// kg
  pub weight: String,
  /// cm
  pub height: String,
  pub activity_level: ActivityLevel,
  pub goals: BTreeSet<String>,
  pub dietary_restrictions: String,
  pub medical_conditions: String,
}

impl UserProfile {
  pub fn goals_joined(&self, separator: &str) -> String {
    self.goals.iter().map(String::as_str).collect::<Vec<_>>().join(separator)
  }

  /// Personalization block handed to the content generator
  pub fn context_summary(&self) -> String {
    fn or_none(value: &str) -> &str {
      if value.trim().is_empty() {
        "None"
      } else {
        value
      }
    }

    format!(
      r#"USER CONTEXT (use it to personalize the answer):
- Name: {}
- Age: {} years
- Sex: {}
- Weight: {} kg
- Height: {} cm
- Activity level: {}
- Goals: {}
- Dietary restrictions: {}
- Medical conditions: {}"#,
      self.name,
      self.age,
      self.gender,
      self.weight,
      self.height,
      self.activity_level,
      self.goals_joined(", "),
      or_none(&self.dietary_restrictions),
      or_none(&self.medical_conditions),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_web_client_record() {
    let raw = r#"{
      "name": "Ana",
      "age": "31",
      "gender": "female",
      "weight": "62",
      "height": "168",
      "activityLevel": "intense",
      "goals": ["hypertrophy", "weight_loss"],
      "dietaryRestrictions": "lactose",
      "medicalConditions": ""
    }"#;

    let profile: UserProfile = serde_json::from_str(raw).unwrap();
    assert_eq!(profile.name, "Ana");
    assert_eq!(profile.gender, Gender::Female);
    assert_eq!(profile.activity_level, ActivityLevel::Intense);
    assert!(profile.goals.contains("weight_loss"));
  }

  #[test]
  fn test_sparse_record_takes_defaults() {
    let profile: UserProfile = serde_json::from_str(r#"{"name":"Ana","goals":["loss"]}"#).unwrap();
    assert_eq!(profile.gender, Gender::Male);
    assert_eq!(profile.activity_level, ActivityLevel::Moderate);
    assert_eq!(profile.goals.len(), 1);
  }

  #[test]
  fn test_duplicate_goals_collapse() {
    let profile: UserProfile =
      serde_json::from_str(r#"{"name":"Ana","goals":["loss","loss","focus"]}"#).unwrap();
    assert_eq!(profile.goals.len(), 2);
  }

  #[test]
  fn test_serializes_camel_case() {
    let profile = UserProfile {
      name: "Ana".to_string(),
      activity_level: ActivityLevel::Light,
      ..Default::default()
    };
    let json = serde_json::to_string(&profile).unwrap();
    assert!(json.contains("\"activityLevel\":\"light\""));
    assert!(json.contains("\"dietaryRestrictions\""));
  }

  #[test]
  fn test_context_summary_marks_empty_fields() {
    let profile = UserProfile {
      name: "Ana".to_string(),
      goals: ["focus".to_string()].into_iter().collect(),
      ..Default::default()
    };
    let summary = profile.context_summary();
    assert!(summary.contains("- Name: Ana"));
    assert!(summary.contains("- Goals: focus"));
    assert!(summary.contains("- Dietary restrictions: None"));
  }
}
