//! Request bookkeeping for calls to the content generator
//!
//! A generation call may still be in flight when the user moves on or a newer
//! request starts. Tickets let the caller drop a late response instead of
//! letting it overwrite newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// UI-observable state of a state-creating request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
  #[default]
  Idle,
  Pending,
  Succeeded,
  /// The generator returned nothing; prior content is untouched
  Failed,
}

/// Outcome of a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation<T> {
  Produced(T),
  /// Generator failed or returned nothing
  Unavailable,
  /// A newer request started (or state was rehydrated) before this one finished
  Superseded,
}

impl<T> Generation<T> {
  pub fn produced(self) -> Option<T> {
    match self {
      Self::Produced(value) => Some(value),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Issues tickets; only the most recent one is current
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
  latest: Arc<AtomicU64>,
}

impl RequestSequencer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn begin(&self) -> RequestTicket {
    RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
  }

  pub fn is_current(&self, ticket: RequestTicket) -> bool {
    self.latest.load(Ordering::SeqCst) == ticket.0
  }

  /// Supersede whatever is in flight
  pub fn invalidate(&self) {
    self.latest.fetch_add(1, Ordering::SeqCst);
  }
}

/// Ticketing plus a watch channel carrying the current `LoadState`
#[derive(Debug, Clone)]
pub struct RequestTracker {
  sequencer: RequestSequencer,
  state: Arc<watch::Sender<LoadState>>,
}

impl Default for RequestTracker {
  fn default() -> Self {
    Self::new()
  }
}

impl RequestTracker {
  pub fn new() -> Self {
    let (state, _) = watch::channel(LoadState::Idle);
    Self {
      sequencer: RequestSequencer::new(),
      state: Arc::new(state),
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<LoadState> {
    self.state.subscribe()
  }

  pub fn state(&self) -> LoadState {
    *self.state.borrow()
  }

  pub fn begin(&self) -> RequestTicket {
    self.state.send_replace(LoadState::Pending);
    self.sequencer.begin()
  }

  pub fn is_current(&self, ticket: RequestTicket) -> bool {
    self.sequencer.is_current(ticket)
  }

  /// Record the final state, returning false if the ticket was superseded
  pub fn finish(&self, ticket: RequestTicket, outcome: LoadState) -> bool {
    if !self.sequencer.is_current(ticket) {
      return false;
    }
    self.state.send_replace(outcome);
    true
  }

  pub fn invalidate(&self) {
    self.sequencer.invalidate();
    self.state.send_replace(LoadState::Idle);
  }
}
