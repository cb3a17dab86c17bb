use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::priority::Priority;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoasDropDetail {
    pub current_roas: f64,
    pub previous_roas: f64,
    pub drop_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpaHighDetail {
    pub current_cpa: f64,
    pub target_cpa: f64,
    pub above_target_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpressionLossDetail {
    pub lost_percent: f64,
    pub impressions: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrDeclineDetail {
    /// CTR of each week in the declining window, most recent first
    pub weekly_ctr: Vec<f64>,
    pub consecutive_weeks: usize,
    pub total_drop_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRateDetail {
    pub monthly_budget: f64,
    pub month_to_date_spend: f64,
    pub expected_spend: f64,
    pub burn_rate: f64,
    pub day_of_month: u32,
    pub days_in_month: u32,
    pub projected_monthly_spend: f64,
    pub projected_overspend: f64,
}

/// Detector-specific payload, keyed by alert type. Only the rendering
/// layer looks inside; the engine stores it as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertDetail {
    RoasDrop(RoasDropDetail),
    CpaHigh(CpaHighDetail),
    ImpressionLossBudget(ImpressionLossDetail),
    ImpressionLossRank(ImpressionLossDetail),
    CtrDecline(CtrDeclineDetail),
    BurnRate(BurnRateDetail),
}

impl AlertDetail {
    #[must_use]
    pub const fn alert_type(&self) -> AlertType {
        match self {
            Self::RoasDrop(_) => AlertType::RoasDrop,
            Self::CpaHigh(_) => AlertType::CpaHigh,
            Self::ImpressionLossBudget(_) => AlertType::ImpressionLossBudget,
            Self::ImpressionLossRank(_) => AlertType::ImpressionLossRank,
            Self::CtrDecline(_) => AlertType::CtrDecline,
            Self::BurnRate(_) => AlertType::BurnRate,
        }
    }
}

/// What a detector produces: an alert that has not been deduplicated or stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub threshold: f64,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    /// Deviation fed to the priority classifier
    pub magnitude: f64,
    pub detail: AlertDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub campaign_id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub priority: Priority,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    pub threshold: f64,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub detail: AlertDetail,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub email_sent: bool,
    pub chat_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Build a fresh, unread, undelivered `Active` alert from a detector candidate.
    #[must_use]
    pub fn from_candidate(
        candidate: AlertCandidate,
        campaign_id: &str,
        recipient_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id: campaign_id.to_string(),
            recipient_id: recipient_id.to_string(),
            alert_type: candidate.alert_type,
            priority: candidate.priority,
            status: AlertStatus::Active,
            title: candidate.title,
            message: candidate.message,
            threshold: candidate.threshold,
            current_value: candidate.current_value,
            previous_value: candidate.previous_value,
            detail: candidate.detail,
            is_read: false,
            read_at: None,
            email_sent: false,
            chat_sent: false,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }
}

/// Partial update applied by `AlertStore::update`; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertUpdate {
    pub priority: Option<Priority>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub threshold: Option<f64>,
    pub current_value: Option<f64>,
    pub previous_value: Option<Option<f64>>,
    pub detail: Option<AlertDetail>,
    pub is_read: Option<bool>,
    pub read_at: Option<DateTime<Utc>>,
    pub email_sent: Option<bool>,
    pub chat_sent: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AlertUpdate {
    /// Refresh everything a re-detection can change.
    #[must_use]
    pub fn refresh(candidate: &AlertCandidate, now: DateTime<Utc>) -> Self {
        Self {
            priority: Some(candidate.priority),
            title: Some(candidate.title.clone()),
            message: Some(candidate.message.clone()),
            threshold: Some(candidate.threshold),
            current_value: Some(candidate.current_value),
            previous_value: Some(candidate.previous_value),
            detail: Some(candidate.detail.clone()),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn read(now: DateTime<Utc>) -> Self {
        Self {
            is_read: Some(true),
            read_at: Some(now),
            ..Self::default()
        }
    }

    /// Apply this update to an in-memory alert.
    pub fn apply_to(&self, alert: &mut Alert) {
        if let Some(priority) = self.priority {
            alert.priority = priority;
        }
        if let Some(title) = &self.title {
            alert.title.clone_from(title);
        }
        if let Some(message) = &self.message {
            alert.message.clone_from(message);
        }
        if let Some(threshold) = self.threshold {
            alert.threshold = threshold;
        }
        if let Some(current) = self.current_value {
            alert.current_value = current;
        }
        if let Some(previous) = self.previous_value {
            alert.previous_value = previous;
        }
        if let Some(detail) = &self.detail {
            alert.detail = detail.clone();
        }
        if let Some(is_read) = self.is_read {
            alert.is_read = is_read;
        }
        if let Some(read_at) = self.read_at {
            alert.read_at = Some(read_at);
        }
        if let Some(email_sent) = self.email_sent {
            alert.email_sent = email_sent;
        }
        if let Some(chat_sent) = self.chat_sent {
            alert.chat_sent = chat_sent;
        }
        if let Some(updated_at) = self.updated_at {
            alert.updated_at = updated_at;
        }
    }
}
