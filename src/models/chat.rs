use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// AI-driven roles, each with its own independent transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
  Dashboard,
  Nutri,
  Psych,
  Coach,
  Routine,
  Spirit,
}

impl Persona {
  pub const ALL: [Persona; 6] = [
    Persona::Dashboard,
    Persona::Nutri,
    Persona::Psych,
    Persona::Coach,
    Persona::Routine,
    Persona::Spirit,
  ];

  pub fn title(&self) -> &'static str {
    match self {
      Self::Dashboard => "Dashboard",
      Self::Nutri => "Sports Nutritionist",
      Self::Psych => "Performance Psychologist",
      Self::Coach => "Strength Coach",
      Self::Routine => "Weekly Routine",
      Self::Spirit => "Daily Devotional",
    }
  }

  /// Seed message (id, text) shown before the user says anything
  pub fn greeting(&self) -> Option<(&'static str, &'static str)> {
    match self {
      Self::Nutri => Some((
        "init-nutri",
        "**Hello!** I'm your Sports Nutritionist.\nI've reviewed your profile. Let's tune your diet to your goals. What did you eat today?",
      )),
      Self::Psych => Some((
        "init-psych",
        "**Welcome.** I'm your Performance Psychologist.\nBased on your data, let's work on your mindset. How are you feeling about your goals?",
      )),
      Self::Coach => Some((
        "init-coach",
        "**Let's train.** I'm your Coach.\nI'm here for technical questions. For your full plan, open the Routine tab. What's on your mind today?",
      )),
      _ => None,
    }
  }
}

impl std::fmt::Display for Persona {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Dashboard => write!(f, "dashboard"),
      Self::Nutri => write!(f, "nutri"),
      Self::Psych => write!(f, "psych"),
      Self::Coach => write!(f, "coach"),
      Self::Routine => write!(f, "routine"),
      Self::Spirit => write!(f, "spirit"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

/// One chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id: String,
  pub role: Role,
  pub text: String,
  pub timestamp: DateTime<Utc>,
}
