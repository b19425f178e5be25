use serde::{Deserialize, Serialize};

/// Daily devotional produced by the content generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevotionalContent {
  pub verse: String,
  /// e.g. "Philippians 4:13"
  pub reference: String,
  pub reflection: String,
  pub prayer: String,
}
