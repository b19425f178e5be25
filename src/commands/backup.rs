//! Backup export and restore commands

use serde::Serialize;

use crate::app::{AppError, AppState};
use crate::generator::ContentGenerator;
use crate::reminder::Notifier;
use crate::store::StorageBackend;

/// A backup ready to be saved to disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupFile {
  pub file_name: String,
  pub contents: String,
}

pub async fn export_backup<B, G, N>(state: &AppState<B, G, N>) -> Result<BackupFile, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  let contents = state
    .export_backup()
    .await
    .map_err(|e| format!("Failed to export backup: {}", e))?;

  Ok(BackupFile {
    file_name: state.backup_file_name(),
    contents,
  })
}

/// Restore a backup file. On success every view reloads from storage.
pub async fn restore_backup<B, G, N>(state: &AppState<B, G, N>, contents: String) -> Result<String, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  match state.restore_backup(&contents).await {
    Ok(_) => Ok("Data restored successfully! Reloading...".to_string()),
    Err(AppError::Backup(e)) => Err(format!("Invalid backup file: {}", e)),
    Err(e) => Err(format!("Failed to restore backup: {}", e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::save_profile;
  use crate::commands::tests::test_state;
  use crate::test_utils::{mock_profile, ScriptedGenerator};

  #[tokio::test]
  async fn test_export_then_restore() {
    let (source, _) = test_state(ScriptedGenerator::new()).await;
    save_profile(&source, mock_profile("Ana")).await.unwrap();
    let file = export_backup(&source).await.unwrap();
    assert_eq!(file.file_name, "performance_ai_backup_2026-10-14.json");

    let (target, _) = test_state(ScriptedGenerator::new()).await;
    restore_backup(&target, file.contents).await.unwrap();
    assert_eq!(target.profile(), Some(mock_profile("Ana")));
  }

  #[tokio::test]
  async fn test_invalid_file_is_reported() {
    let (state, _) = test_state(ScriptedGenerator::new()).await;
    let err = restore_backup(&state, "<html>".to_string()).await.unwrap_err();
    assert!(err.starts_with("Invalid backup file"), "{}", err);
  }
}
