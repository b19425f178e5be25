//! Environment-driven configuration

use std::env;
use std::time::Duration;

use crate::llm::{DEFAULT_CLAUDE_BASE_URL, DEFAULT_CLAUDE_MODEL};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://zenite.db?mode=rwc";

/// Browser-like storage allowance
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_REMINDER_DELAY_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {name}: {value}")]
  Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_url: String,
  /// `None` disables the quota
  pub storage_quota_bytes: Option<usize>,
  pub reminder_delay: Duration,
  pub anthropic_api_key: Option<String>,
  pub claude_model: String,
  pub claude_base_url: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      storage_quota_bytes: Some(DEFAULT_STORAGE_QUOTA_BYTES),
      reminder_delay: Duration::from_secs(DEFAULT_REMINDER_DELAY_SECS),
      anthropic_api_key: None,
      claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
      claude_base_url: DEFAULT_CLAUDE_BASE_URL.to_string(),
    }
  }
}

impl AppConfig {
  /// Read configuration from the process environment. Unset variables take
  /// their defaults; blank ones count as unset.
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let storage_quota_bytes = match parse_var::<usize>("ZENITE_STORAGE_QUOTA_BYTES")? {
      Some(0) => None,
      Some(quota) => Some(quota),
      None => defaults.storage_quota_bytes,
    };

    let reminder_delay = parse_var::<u64>("ZENITE_REMINDER_DELAY_SECS")?
      .map(Duration::from_secs)
      .unwrap_or(defaults.reminder_delay);

    Ok(Self {
      database_url: var("ZENITE_DATABASE_URL").unwrap_or(defaults.database_url),
      storage_quota_bytes,
      reminder_delay,
      anthropic_api_key: var("ANTHROPIC_API_KEY"),
      claude_model: var("ZENITE_CLAUDE_MODEL").unwrap_or(defaults.claude_model),
      claude_base_url: var("ZENITE_CLAUDE_BASE_URL").unwrap_or(defaults.claude_base_url),
    })
  }
}

fn var(name: &str) -> Option<String> {
  env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
  match var(name) {
    None => Ok(None),
    Some(value) => value
      .parse()
      .map(Some)
      .map_err(|_| ConfigError::Invalid { name, value }),
  }
}
