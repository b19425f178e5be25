//! Backup export and restore
//!
//! A backup is a JSON document holding the four stored values verbatim plus
//! the moment it was taken. Restores validate the whole document before
//! writing anything, and land every present key in one atomic write.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::store::{PersistedStore, StorageBackend, StorageKey, StoreError};

/// Document fields and the keys they restore into
const BUNDLE_FIELDS: [(&str, StorageKey); 4] = [
  ("profile", StorageKey::Profile),
  ("workout", StorageKey::Workout),
  ("devotional", StorageKey::Devotional),
  ("devotionalDate", StorageKey::DevotionalDate),
];

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
  #[error("Backup is not valid JSON: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("Backup document must be a JSON object")]
  NotAnObject,

  #[error("Backup field '{0}' must be a string or null")]
  InvalidField(&'static str),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Snapshot of every stored value, serialized as the backup document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
  pub profile: Option<String>,
  pub workout: Option<String>,
  pub devotional: Option<String>,
  pub devotional_date: Option<String>,
  pub timestamp: DateTime<Utc>,
}

/// e.g. `performance_ai_backup_2026-10-14.json`
pub fn backup_file_name(date: NaiveDate) -> String {
  format!("performance_ai_backup_{}.json", date.format("%Y-%m-%d"))
}

pub struct BackupService<B> {
  store: PersistedStore<B>,
  clock: Arc<dyn Clock>,
}

impl<B> Clone for BackupService<B> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      clock: Arc::clone(&self.clock),
    }
  }
}

impl<B: StorageBackend> BackupService<B> {
  pub fn new(store: PersistedStore<B>, clock: Arc<dyn Clock>) -> Self {
    Self { store, clock }
  }

  /// Read every key as stored. Never writes.
  pub async fn snapshot(&self) -> Result<ExportBundle, StoreError> {
    Ok(ExportBundle {
      profile: self.store.read(StorageKey::Profile).await?,
      workout: self.store.read(StorageKey::Workout).await?,
      devotional: self.store.read(StorageKey::Devotional).await?,
      devotional_date: self.store.read(StorageKey::DevotionalDate).await?,
      timestamp: self.clock.now(),
    })
  }

  pub async fn export(&self) -> Result<String, BackupError> {
    let bundle = self.snapshot().await?;
    let document = serde_json::to_string_pretty(&bundle)?;
    info!(bytes = document.len(), "Backup exported");
    Ok(document)
  }

  /// Suggested file name for an export taken today
  pub fn file_name(&self) -> String {
    backup_file_name(self.clock.today())
  }

  /// Restore a backup document, returning the keys it overwrote.
  ///
  /// Fields that are missing, null or empty leave their key untouched.
  pub async fn import_document(&self, document: &str) -> Result<Vec<StorageKey>, BackupError> {
    let entries = parse_document(document)?;
    let keys: Vec<StorageKey> = entries.iter().map(|(key, _)| *key).collect();

    self.store.write_many(entries).await?;

    info!(keys = ?keys, "Backup restored");
    Ok(keys)
  }

  /// Restore a backup, reporting only success or failure
  pub async fn import(&self, document: &str) -> bool {
    match self.import_document(document).await {
      Ok(_) => true,
      Err(BackupError::Store(e)) => {
        error!(error = %e, "Backup restore could not be written");
        false
      }
      Err(e) => {
        warn!(error = %e, "Backup restore rejected");
        false
      }
    }
  }
}

/// Validate the whole document and collect the entries to write
fn parse_document(document: &str) -> Result<Vec<(StorageKey, String)>, BackupError> {
  let value: Value = serde_json::from_str(document)?;
  let Value::Object(fields) = value else {
    return Err(BackupError::NotAnObject);
  };

  let mut entries = Vec::with_capacity(BUNDLE_FIELDS.len());
  for (field, key) in BUNDLE_FIELDS {
    match fields.get(field) {
      None | Some(Value::Null) => {}
      Some(Value::String(raw)) if raw.is_empty() => {}
      Some(Value::String(raw)) => entries.push((key, raw.clone())),
      Some(_) => return Err(BackupError::InvalidField(field)),
    }
  }
  Ok(entries)
}
