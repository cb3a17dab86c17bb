use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::alert::{Alert, AlertUpdate};
use crate::domain::ports::store::{
    sort_for_listing, AlertFilter, AlertPage, AlertStore, CreateOutcome, Pagination, StoreError,
};
use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::alert_type::AlertType;

/// In-memory store for tests and dry runs.
pub struct InMemoryStore {
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut Alert)) -> Result<Alert, StoreError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        f(alert);
        Ok(alert.clone())
    }
}

fn latest_active<'a>(
    alerts: &'a [Alert],
    campaign_id: &str,
    alert_type: AlertType,
    since: DateTime<Utc>,
) -> Option<&'a Alert> {
    alerts
        .iter()
        .filter(|a| {
            a.campaign_id == campaign_id
                && a.alert_type == alert_type
                && a.status == AlertStatus::Active
                && a.created_at >= since
        })
        .max_by_key(|a| a.created_at)
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn find_active_since(
        &self,
        campaign_id: &str,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        Ok(latest_active(&alerts, campaign_id, alert_type, since).cloned())
    }

    async fn create_unless_active(
        &self,
        alert: &Alert,
        since: DateTime<Utc>,
    ) -> Result<CreateOutcome, StoreError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if let Some(existing) = latest_active(&alerts, &alert.campaign_id, alert.alert_type, since) {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }
        alerts.push(alert.clone());
        Ok(CreateOutcome::Created(alert.clone()))
    }

    async fn create(&self, alert: &Alert) -> Result<Alert, StoreError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if alerts.iter().any(|a| a.id == alert.id) {
            return Err(StoreError::WriteFailed(format!(
                "alert {} already exists",
                alert.id
            )));
        }
        alerts.push(alert.clone());
        Ok(alert.clone())
    }

    async fn update(&self, id: Uuid, update: &AlertUpdate) -> Result<Alert, StoreError> {
        self.modify(id, |a| update.apply_to(a))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: &Pagination,
    ) -> Result<AlertPage, StoreError> {
        let mut matching: Vec<Alert> = self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_for_listing(&mut matching);
        let total = matching.len();
        let alerts = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page)
            .collect();
        Ok(AlertPage { alerts, total })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        self.modify(id, |a| {
            a.status = status;
            a.updated_at = at;
            if status.is_terminal() {
                a.resolved_at = Some(at);
            }
        })
    }

    async fn mark_all_read(&self, recipient_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut count = 0;
        for alert in alerts
            .iter_mut()
            .filter(|a| a.recipient_id == recipient_id && !a.is_read)
        {
            alert.is_read = true;
            alert.read_at = Some(at);
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        if alerts.len() == before {
            return Err(StoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }
}
