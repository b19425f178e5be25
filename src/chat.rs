//! In-memory chat sessions, one transcript per persona
//!
//! Transcripts are process-local and reset on restart. Greeting personas start
//! with one seeded assistant message; the rest start empty.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::clock::Clock;
use crate::generator::ContentGenerator;
use crate::models::{Message, Persona, Role, UserProfile};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
  #[error("Message is empty")]
  EmptyMessage,

  #[error("A reply from {0} is already pending")]
  Busy(Persona),

  #[error("Conversation was reset before the reply arrived")]
  Superseded,
}

struct Sessions {
  transcripts: BTreeMap<Persona, Vec<Message>>,
  /// Persona -> epoch of its in-flight request
  pending: HashMap<Persona, u64>,
  epoch: u64,
  next_id: u64,
}

impl Sessions {
  fn seeded(clock: &dyn Clock, next_id: u64) -> Self {
    let now = clock.now();
    let transcripts = Persona::ALL
      .iter()
      .map(|persona| {
        let seed: Vec<Message> = persona
          .greeting()
          .map(|(id, text)| Message {
            id: id.to_string(),
            role: Role::Assistant,
            text: text.to_string(),
            timestamp: now,
          })
          .into_iter()
          .collect();
        (*persona, seed)
      })
      .collect();

    Self {
      transcripts,
      pending: HashMap::new(),
      epoch: 0,
      next_id,
    }
  }

  fn message(&mut self, role: Role, text: String, clock: &dyn Clock) -> Message {
    self.next_id += 1;
    Message {
      id: format!("msg-{}", self.next_id),
      role,
      text,
      timestamp: clock.now(),
    }
  }
}

/// Chat state shared by every view of one context. Clones share sessions.
#[derive(Clone)]
pub struct SessionRegistry {
  sessions: Arc<Mutex<Sessions>>,
  clock: Arc<dyn Clock>,
}

impl SessionRegistry {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    let sessions = Sessions::seeded(clock.as_ref(), 0);
    Self {
      sessions: Arc::new(Mutex::new(sessions)),
      clock,
    }
  }

  fn sessions(&self) -> MutexGuard<'_, Sessions> {
    self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn transcript(&self, persona: Persona) -> Vec<Message> {
    self.sessions().transcripts.get(&persona).cloned().unwrap_or_default()
  }

  pub fn is_pending(&self, persona: Persona) -> bool {
    self.sessions().pending.contains_key(&persona)
  }

  /// Send `text` as the user and wait for the persona's reply.
  ///
  /// The user message is appended before the generator is called, so views
  /// show it immediately.
  pub async fn send<G: ContentGenerator>(
    &self,
    persona: Persona,
    text: &str,
    generator: &G,
    profile: Option<&UserProfile>,
  ) -> Result<Message, ChatError> {
    let text = text.trim();
    if text.is_empty() {
      return Err(ChatError::EmptyMessage);
    }

    let (history, epoch) = self.begin_send(persona, text)?;
    let reply = generator.converse(text, &history, persona, profile).await;
    self.finish_send(persona, epoch, reply)
  }

  /// Restore the seeded state. Replies still in flight are discarded.
  pub fn reset(&self) {
    let mut sessions = self.sessions();
    let epoch = sessions.epoch + 1;
    let next_id = sessions.next_id;
    *sessions = Sessions::seeded(self.clock.as_ref(), next_id);
    sessions.epoch = epoch;
    debug!(epoch, "Chat sessions reset");
  }

  fn begin_send(&self, persona: Persona, text: &str) -> Result<(Vec<Message>, u64), ChatError> {
    let mut sessions = self.sessions();
    if sessions.pending.contains_key(&persona) {
      return Err(ChatError::Busy(persona));
    }

    let message = sessions.message(Role::User, text.to_string(), self.clock.as_ref());
    let epoch = sessions.epoch;
    let transcript = sessions.transcripts.entry(persona).or_default();
    let history = transcript.clone();
    transcript.push(message);
    sessions.pending.insert(persona, epoch);

    Ok((history, epoch))
  }

  fn finish_send(&self, persona: Persona, epoch: u64, reply: String) -> Result<Message, ChatError> {
    let mut sessions = self.sessions();
    if sessions.epoch != epoch || sessions.pending.get(&persona) != Some(&epoch) {
      debug!(%persona, "Discarding reply for a reset conversation");
      return Err(ChatError::Superseded);
    }

    sessions.pending.remove(&persona);
    let message = sessions.message(Role::Assistant, reply, self.clock.as_ref());
    sessions.transcripts.entry(persona).or_default().push(message.clone());
    Ok(message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_profile, FixedClock, ScriptedGenerator};
  use chrono::NaiveDate;

  fn registry() -> SessionRegistry {
    let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()));
    SessionRegistry::new(clock)
  }

  #[test]
  fn test_greeting_personas_are_seeded() {
    let registry = registry();

    for persona in [Persona::Nutri, Persona::Psych, Persona::Coach] {
      let transcript = registry.transcript(persona);
      assert_eq!(transcript.len(), 1);
      assert_eq!(transcript[0].role, Role::Assistant);
    }
    assert_eq!(registry.transcript(Persona::Nutri)[0].id, "init-nutri");
    assert!(registry.transcript(Persona::Dashboard).is_empty());
    assert!(registry.transcript(Persona::Spirit).is_empty());
  }

  #[tokio::test]
  async fn test_send_appends_user_then_reply() {
    let registry = registry();
    let generator = ScriptedGenerator::new().with_reply("Eat more protein.");
    let profile = mock_profile("Ana");

    let reply = registry
      .send(Persona::Nutri, "  What should I eat?  ", &generator, Some(&profile))
      .await
      .unwrap();

    let transcript = registry.transcript(Persona::Nutri);
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].role, Role::User);
    assert_eq!(transcript[1].text, "What should I eat?");
    assert_eq!(transcript[2], reply);
    assert_eq!(reply.text, "Eat more protein.");

    // Generator saw only the greeting, not the new message
    assert_eq!(generator.last_transcript_len(), Some(1));
  }

  #[tokio::test]
  async fn test_transcripts_are_independent() {
    let registry = registry();
    let generator = ScriptedGenerator::new();

    registry.send(Persona::Coach, "Squat depth?", &generator, None).await.unwrap();

    assert_eq!(registry.transcript(Persona::Coach).len(), 3);
    assert_eq!(registry.transcript(Persona::Psych).len(), 1);
  }

  #[tokio::test]
  async fn test_empty_message_is_rejected() {
    let registry = registry();
    let result = registry.send(Persona::Psych, "   ", &ScriptedGenerator::new(), None).await;

    assert_eq!(result, Err(ChatError::EmptyMessage));
    assert_eq!(registry.transcript(Persona::Psych).len(), 1);
  }

  #[tokio::test]
  async fn test_message_ids_are_unique() {
    let registry = registry();
    let generator = ScriptedGenerator::new();
    registry.send(Persona::Dashboard, "one", &generator, None).await.unwrap();
    registry.send(Persona::Dashboard, "two", &generator, None).await.unwrap();

    let ids: std::collections::HashSet<String> =
      registry.transcript(Persona::Dashboard).into_iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 4);
  }

  #[tokio::test]
  async fn test_second_send_while_pending_is_busy() {
    let registry = registry();
    let generator = Arc::new(ScriptedGenerator::new().gated());

    let task = {
      let registry = registry.clone();
      let generator = Arc::clone(&generator);
      tokio::spawn(async move { registry.send(Persona::Coach, "first", &*generator, None).await })
    };
    generator.wait_for_call().await;

    assert!(registry.is_pending(Persona::Coach));
    let second = registry.send(Persona::Coach, "second", &ScriptedGenerator::new(), None).await;
    assert_eq!(second, Err(ChatError::Busy(Persona::Coach)));

    generator.release();
    task.await.unwrap().unwrap();
    assert!(!registry.is_pending(Persona::Coach));
  }

  #[tokio::test]
  async fn test_reset_discards_in_flight_reply() {
    let registry = registry();
    let generator = Arc::new(ScriptedGenerator::new().gated());

    let task = {
      let registry = registry.clone();
      let generator = Arc::clone(&generator);
      tokio::spawn(async move { registry.send(Persona::Nutri, "hello", &*generator, None).await })
    };
    generator.wait_for_call().await;

    registry.reset();
    generator.release();

    assert_eq!(task.await.unwrap(), Err(ChatError::Superseded));
    let transcript = registry.transcript(Persona::Nutri);
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].id, "init-nutri");
    assert!(!registry.is_pending(Persona::Nutri));
  }
}
