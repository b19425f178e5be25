//! Persona chat commands

use crate::app::AppState;
use crate::chat::ChatError;
use crate::generator::ContentGenerator;
use crate::models::{Message, Persona};
use crate::reminder::Notifier;
use crate::store::StorageBackend;

pub fn get_transcript<B, G, N>(state: &AppState<B, G, N>, persona: Persona) -> Vec<Message>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state.transcript(persona)
}

/// Send a message and return the persona's reply
pub async fn send_message<B, G, N>(state: &AppState<B, G, N>, persona: Persona, text: String) -> Result<Message, String>
where
  B: StorageBackend,
  G: ContentGenerator,
  N: Notifier,
{
  state.send_message(persona, &text).await.map_err(|e| match e {
    ChatError::EmptyMessage => "Type a message first".to_string(),
    ChatError::Busy(_) => "Still waiting for the previous reply".to_string(),
    ChatError::Superseded => "The conversation was reset".to_string(),
  })
}
