use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::error::{parse_alert_id, validate_id, EngineError};
use crate::domain::entities::alert::{Alert, AlertUpdate};
use crate::domain::ports::store::{AlertFilter, AlertPage, AlertStore, Pagination};
use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::priority::Priority;

/// Counts over a recipient's alerts created within a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub window_days: u32,
    pub total: usize,
    pub unread: usize,
    pub by_status: BTreeMap<AlertStatus, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_type: BTreeMap<AlertType, usize>,
}

/// Recipient-facing operations on stored alerts. Every call is scoped to the
/// recipient; touching someone else's alert is a permission error.
pub struct AlertLifecycle {
    store: Arc<dyn AlertStore>,
}

impl AlertLifecycle {
    #[must_use]
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    async fn owned(&self, recipient_id: &str, id: Uuid) -> Result<Alert, EngineError> {
        let alert = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("alert {id}")))?;
        if alert.recipient_id != recipient_id {
            return Err(EngineError::Permission(format!(
                "alert {id} does not belong to {recipient_id}"
            )));
        }
        Ok(alert)
    }

    /// # Errors
    ///
    /// `Validation`, `NotFound`, `Permission`, or a store failure.
    pub async fn mark_as_read(&self, recipient_id: &str, alert_id: &str) -> Result<Alert, EngineError> {
        validate_id("recipient id", recipient_id)?;
        let id = parse_alert_id(alert_id)?;
        let alert = self.owned(recipient_id, id).await?;
        if alert.is_read {
            return Ok(alert);
        }
        Ok(self.store.update(id, &AlertUpdate::read(Utc::now())).await?)
    }

    /// Mark several alerts read. All ids are checked before anything changes.
    ///
    /// # Errors
    ///
    /// `Validation`, `NotFound`, `Permission`, or a store failure.
    pub async fn mark_multiple_as_read(
        &self,
        recipient_id: &str,
        alert_ids: &[String],
    ) -> Result<Vec<Alert>, EngineError> {
        validate_id("recipient id", recipient_id)?;
        if alert_ids.is_empty() {
            return Err(EngineError::Validation("no alert ids given".to_string()));
        }
        let ids = alert_ids
            .iter()
            .map(|raw| parse_alert_id(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut alerts = Vec::with_capacity(ids.len());
        for id in &ids {
            alerts.push(self.owned(recipient_id, *id).await?);
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(alerts.len());
        for alert in alerts {
            if alert.is_read {
                updated.push(alert);
            } else {
                updated.push(self.store.update(alert.id, &AlertUpdate::read(now)).await?);
            }
        }
        Ok(updated)
    }

    /// # Errors
    ///
    /// `Validation` or a store failure.
    pub async fn mark_all_as_read(&self, recipient_id: &str) -> Result<usize, EngineError> {
        validate_id("recipient id", recipient_id)?;
        let count = self.store.mark_all_read(recipient_id, Utc::now()).await?;
        tracing::debug!(recipient_id, count, "Marked all alerts read");
        Ok(count)
    }

    /// Acknowledging also marks the alert read.
    ///
    /// # Errors
    ///
    /// `Precondition` if the alert is already closed, plus the usual lookup errors.
    pub async fn acknowledge(&self, recipient_id: &str, alert_id: &str) -> Result<Alert, EngineError> {
        let alert = self
            .transition(recipient_id, alert_id, AlertStatus::Acknowledged)
            .await?;
        if alert.is_read {
            return Ok(alert);
        }
        Ok(self
            .store
            .update(alert.id, &AlertUpdate::read(Utc::now()))
            .await?)
    }

    /// # Errors
    ///
    /// `Precondition` if the alert is already closed, plus the usual lookup errors.
    pub async fn resolve(&self, recipient_id: &str, alert_id: &str) -> Result<Alert, EngineError> {
        self.transition(recipient_id, alert_id, AlertStatus::Resolved)
            .await
    }

    /// # Errors
    ///
    /// `Precondition` if the alert is already closed, plus the usual lookup errors.
    pub async fn dismiss(&self, recipient_id: &str, alert_id: &str) -> Result<Alert, EngineError> {
        self.transition(recipient_id, alert_id, AlertStatus::Dismissed)
            .await
    }

    async fn transition(
        &self,
        recipient_id: &str,
        alert_id: &str,
        next: AlertStatus,
    ) -> Result<Alert, EngineError> {
        validate_id("recipient id", recipient_id)?;
        let id = parse_alert_id(alert_id)?;
        let alert = self.owned(recipient_id, id).await?;
        if !alert.status.can_transition_to(next) {
            return Err(EngineError::Precondition(format!(
                "alert {id} cannot move from {} to {next}",
                alert.status
            )));
        }
        let updated = self.store.update_status(id, next, Utc::now()).await?;
        tracing::info!(alert_id = %id, from = %alert.status, to = %next, "Alert status changed");
        Ok(updated)
    }

    /// Only resolved or dismissed alerts may be deleted.
    ///
    /// # Errors
    ///
    /// `Precondition` for an open alert, plus the usual lookup errors.
    pub async fn delete(&self, recipient_id: &str, alert_id: &str) -> Result<(), EngineError> {
        validate_id("recipient id", recipient_id)?;
        let id = parse_alert_id(alert_id)?;
        let alert = self.owned(recipient_id, id).await?;
        if !alert.status.is_terminal() {
            return Err(EngineError::Precondition(format!(
                "alert {id} is {} and must be resolved or dismissed first",
                alert.status
            )));
        }
        self.store.delete(id).await?;
        tracing::info!(alert_id = %id, "Alert deleted");
        Ok(())
    }

    /// Page through the recipient's alerts. Any recipient in `filter` is
    /// replaced by `recipient_id`.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad recipient or page, or a store failure.
    pub async fn list(
        &self,
        recipient_id: &str,
        filter: AlertFilter,
        pagination: Pagination,
    ) -> Result<AlertPage, EngineError> {
        validate_id("recipient id", recipient_id)?;
        if pagination.page == 0 || pagination.per_page == 0 {
            return Err(EngineError::Validation(
                "page and per_page start at 1".to_string(),
            ));
        }
        let filter = AlertFilter {
            recipient_id: Some(recipient_id.to_string()),
            ..filter
        };
        Ok(self.store.list(&filter, &pagination).await?)
    }

    /// # Errors
    ///
    /// `Validation` or a store failure.
    pub async fn stats(&self, recipient_id: &str, window_days: u32) -> Result<AlertStats, EngineError> {
        self.stats_at(recipient_id, window_days, Utc::now()).await
    }

    async fn stats_at(
        &self,
        recipient_id: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<AlertStats, EngineError> {
        validate_id("recipient id", recipient_id)?;
        let filter = AlertFilter {
            created_from: Some(now - Duration::days(i64::from(window_days))),
            ..AlertFilter::for_recipient(recipient_id)
        };
        let page = self.store.list(&filter, &Pagination::all()).await?;

        let mut stats = AlertStats {
            window_days,
            total: page.total,
            ..AlertStats::default()
        };
        for alert in &page.alerts {
            if !alert.is_read {
                stats.unread += 1;
            }
            *stats.by_status.entry(alert.status).or_default() += 1;
            *stats.by_priority.entry(alert.priority).or_default() += 1;
            *stats.by_type.entry(alert.alert_type).or_default() += 1;
        }
        Ok(stats)
    }
}
