use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::alert::{Alert, AlertUpdate};
use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::priority::Priority;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("storage unreachable: {0}")]
    Unavailable(String),
}

/// Listing filter; `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub recipient_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub priority: Option<Priority>,
    pub alert_type: Option<AlertType>,
    pub campaign_id: Option<String>,
    pub is_read: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl AlertFilter {
    #[must_use]
    pub fn for_recipient(recipient_id: &str) -> Self {
        Self {
            recipient_id: Some(recipient_id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, alert: &Alert) -> bool {
        self.recipient_id
            .as_ref()
            .map_or(true, |r| *r == alert.recipient_id)
            && self.status.map_or(true, |s| s == alert.status)
            && self.priority.map_or(true, |p| p == alert.priority)
            && self.alert_type.map_or(true, |t| t == alert.alert_type)
            && self
                .campaign_id
                .as_ref()
                .map_or(true, |c| *c == alert.campaign_id)
            && self.is_read.map_or(true, |r| r == alert.is_read)
            && self.created_from.map_or(true, |from| alert.created_at >= from)
            && self.created_to.map_or(true, |to| alert.created_at <= to)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Everything in one page.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            page: 1,
            per_page: usize::MAX,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    /// Matching alerts across all pages
    pub total: usize,
}

/// Result of [`AlertStore::create_unless_active`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Alert),
    /// An active alert for the same campaign and type was already stored,
    /// possibly by another process; nothing was inserted.
    Existing(Alert),
}

/// Default listing order: unread first, then priority descending, then newest first.
pub fn sort_for_listing(alerts: &mut [Alert]) {
    alerts.sort_by_key(|a| (a.is_read, Reverse(a.priority), Reverse(a.created_at)));
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Cheap reachability check run before a batch starts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the backend cannot be reached.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// The `Active` alert of this kind for this campaign created at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    async fn find_active_since(
        &self,
        campaign_id: &str,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError>;

    /// Insert `alert` unless an `Active` alert of the same campaign and type
    /// created at or after `since` exists. Lookup and insert are a single
    /// atomic step for every handle on the same backend.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read or the write fails.
    async fn create_unless_active(
        &self,
        alert: &Alert,
        since: DateTime<Utc>,
    ) -> Result<CreateOutcome, StoreError>;

    /// Persist a new alert.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    async fn create(&self, alert: &Alert) -> Result<Alert, StoreError>;

    /// Apply a partial update and return the stored result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no alert has this id.
    async fn update(&self, id: Uuid, update: &AlertUpdate) -> Result<Alert, StoreError>;

    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    async fn get(&self, id: Uuid) -> Result<Option<Alert>, StoreError>;

    /// Filtered page of alerts in listing order, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: &Pagination,
    ) -> Result<AlertPage, StoreError>;

    /// Set the status; terminal statuses also stamp `resolved_at`. The
    /// caller checks that the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no alert has this id.
    async fn update_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;

    /// Mark every unread alert of the recipient as read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    async fn mark_all_read(&self, recipient_id: &str, at: DateTime<Utc>)
        -> Result<usize, StoreError>;

    /// Remove an alert. The caller enforces the terminal-status precondition.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no alert has this id.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
