use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::domain::entities::alert::{Alert, AlertCandidate, AlertUpdate};
use crate::domain::ports::store::{AlertStore, CreateOutcome, StoreError};
use crate::domain::value_objects::alert_type::AlertType;

/// How far back an `Active` alert still absorbs new detections.
pub const DEDUP_WINDOW_HOURS: i64 = 24;

/// Value movement below this is treated as the same reading.
pub const VALUE_TOLERANCE: f64 = 0.1;

/// What `upsert` did with a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(Alert),
    Refreshed(Alert),
    Unchanged(Alert),
}

impl UpsertOutcome {
    #[must_use]
    pub const fn alert(&self) -> &Alert {
        match self {
            Self::Created(a) | Self::Refreshed(a) | Self::Unchanged(a) => a,
        }
    }

    #[must_use]
    pub fn into_alert(self) -> Alert {
        match self {
            Self::Created(a) | Self::Refreshed(a) | Self::Unchanged(a) => a,
        }
    }

    /// An unchanged alert was already delivered when it was created or last refreshed.
    #[must_use]
    pub const fn needs_dispatch(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Refreshed(_))
    }
}

type DedupKey = (String, AlertType);
type LockMap = Mutex<HashMap<DedupKey, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive hold on one (campaign, type) key. Dropping it releases the lock
/// and forgets the key once no other task is holding or waiting on it.
struct KeyLease<'a> {
    locks: &'a LockMap,
    key: DedupKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Turns detector candidates into stored alerts, keeping at most one live
/// alert per (campaign, type) per rolling day.
///
/// Within a process, upserts for the same pair queue on a per-key lock.
/// Across processes sharing a store, the insert goes through
/// [`AlertStore::create_unless_active`], so a run that loses the race
/// absorbs its detection into the winner's alert instead of inserting a second one.
pub struct Deduplicator {
    store: Arc<dyn AlertStore>,
    locks: LockMap,
}

impl Deduplicator {
    #[must_use]
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lease(&self, campaign_id: &str, alert_type: AlertType) -> KeyLease<'_> {
        let key = (campaign_id.to_string(), alert_type);
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        KeyLease {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the lookup, insert or update fails.
    pub async fn upsert(
        &self,
        candidate: AlertCandidate,
        campaign_id: &str,
        recipient_id: &str,
    ) -> Result<UpsertOutcome, StoreError> {
        self.upsert_at(candidate, campaign_id, recipient_id, Utc::now())
            .await
    }

    /// Same as [`Self::upsert`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the lookup, insert or update fails.
    pub async fn upsert_at(
        &self,
        candidate: AlertCandidate,
        campaign_id: &str,
        recipient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let _lease = self.lease(campaign_id, candidate.alert_type).await;

        let since = now - Duration::hours(DEDUP_WINDOW_HOURS);
        let found = self
            .store
            .find_active_since(campaign_id, candidate.alert_type, since)
            .await?;

        let existing = match found {
            Some(existing) => existing,
            None => {
                let alert =
                    Alert::from_candidate(candidate.clone(), campaign_id, recipient_id, now);
                match self.store.create_unless_active(&alert, since).await? {
                    CreateOutcome::Created(created) => {
                        tracing::info!(
                            alert_id = %created.id,
                            campaign_id,
                            alert_type = %created.alert_type,
                            priority = %created.priority,
                            "New alert created"
                        );
                        return Ok(UpsertOutcome::Created(created));
                    }
                    CreateOutcome::Existing(existing) => {
                        tracing::debug!(
                            alert_id = %existing.id,
                            campaign_id,
                            alert_type = %candidate.alert_type,
                            "Another run stored this alert first"
                        );
                        existing
                    }
                }
            }
        };

        if (existing.current_value - candidate.current_value).abs() <= VALUE_TOLERANCE {
            return Ok(UpsertOutcome::Unchanged(existing));
        }

        tracing::debug!(
            alert_id = %existing.id,
            campaign_id,
            alert_type = %candidate.alert_type,
            "Refreshing active alert ({} -> {})",
            existing.current_value,
            candidate.current_value
        );
        let updated = self
            .store
            .update(existing.id, &AlertUpdate::refresh(&candidate, now))
            .await?;
        Ok(UpsertOutcome::Refreshed(updated))
    }
}
