//! Daily devotional cache
//!
//! Content stays valid for the local calendar day it was generated on. The
//! validity date is compared as a formatted string, so two reads at different
//! times of the same day always agree.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{format_calendar_date, Clock};
use crate::generator::ContentGenerator;
use crate::models::{DevotionalContent, UserProfile};
use crate::request::{Generation, LoadState, RequestTracker};
use crate::store::{PersistedStore, StorageBackend, StorageKey, StoreError};

pub struct DevotionalCache<B> {
  store: PersistedStore<B>,
  clock: Arc<dyn Clock>,
  requests: RequestTracker,
}

impl<B> Clone for DevotionalCache<B> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      clock: Arc::clone(&self.clock),
      requests: self.requests.clone(),
    }
  }
}

impl<B: StorageBackend> DevotionalCache<B> {
  pub fn new(store: PersistedStore<B>, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      clock,
      requests: RequestTracker::new(),
    }
  }

  pub fn requests(&self) -> &RequestTracker {
    &self.requests
  }

  /// Stored content if it was generated today. Stale or corrupt entries miss.
  pub async fn get_if_valid(&self) -> Result<Option<DevotionalContent>, StoreError> {
    let today = format_calendar_date(self.clock.today());

    let stored_date = self.store.read(StorageKey::DevotionalDate).await?;
    if stored_date.as_deref() != Some(today.as_str()) {
      debug!(stored = ?stored_date, today = %today, "Devotional cache miss");
      return Ok(None);
    }

    let Some(raw) = self.store.read(StorageKey::Devotional).await? else {
      return Ok(None);
    };

    match serde_json::from_str::<DevotionalContent>(&raw) {
      Ok(content) => Ok(Some(content)),
      Err(e) => {
        warn!(error = %e, "Stored devotional is malformed, treating as a miss");
        Ok(None)
      }
    }
  }

  /// Replace the cached content and stamp it with today's date
  pub async fn store(&self, content: &DevotionalContent) -> Result<(), StoreError> {
    let raw = serde_json::to_string(content)?;
    let today = format_calendar_date(self.clock.today());

    self
      .store
      .write_many(vec![
        (StorageKey::Devotional, raw),
        (StorageKey::DevotionalDate, today.clone()),
      ])
      .await?;

    info!(reference = %content.reference, date = %today, "Devotional cached");
    Ok(())
  }

  /// Generate fresh content and cache it. A failed generation writes nothing.
  pub async fn refresh<G: ContentGenerator>(
    &self,
    generator: &G,
    profile: Option<&UserProfile>,
  ) -> Result<Generation<DevotionalContent>, StoreError> {
    let ticket = self.requests.begin();
    let generated = generator.generate_devotional(profile).await;

    if !self.requests.is_current(ticket) {
      debug!("Discarding superseded devotional response");
      return Ok(Generation::Superseded);
    }

    let Some(content) = generated else {
      warn!("Devotional generation produced nothing, keeping prior cache");
      self.requests.finish(ticket, LoadState::Failed);
      return Ok(Generation::Unavailable);
    };

    match self.store(&content).await {
      Ok(()) => {
        self.requests.finish(ticket, LoadState::Succeeded);
        Ok(Generation::Produced(content))
      }
      Err(e) => {
        self.requests.finish(ticket, LoadState::Failed);
        Err(e)
      }
    }
  }

  /// Serve today's entry, regenerating on a miss
  pub async fn load_or_refresh<G: ContentGenerator>(
    &self,
    generator: &G,
    profile: Option<&UserProfile>,
  ) -> Result<Generation<DevotionalContent>, StoreError> {
    if let Some(content) = self.get_if_valid().await? {
      return Ok(Generation::Produced(content));
    }
    self.refresh(generator, profile).await
  }
}
