use serde::{Deserialize, Serialize};

/// Average month length used to derive a monthly budget from a daily one.
pub const DAYS_PER_MONTH: f64 = 30.4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Active,
    Paused,
    Ended,
}

/// An advertising campaign, read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    /// Operator who owns the campaign and receives its alerts
    pub recipient_id: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default = "default_true")]
    pub tenant_active: bool,
    #[serde(default)]
    pub daily_budget: Option<f64>,
    #[serde(default)]
    pub monthly_budget: Option<f64>,
    #[serde(default)]
    pub target_roas: Option<f64>,
    #[serde(default)]
    pub target_cpa: Option<f64>,
}

const fn default_true() -> bool {
    true
}

impl Campaign {
    /// Only active campaigns of active tenants are analyzed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.status == CampaignStatus::Active && self.tenant_active
    }

    /// Explicit monthly budget, or the daily budget spread over an average month.
    #[must_use]
    pub fn effective_monthly_budget(&self) -> Option<f64> {
        self.monthly_budget
            .or_else(|| self.daily_budget.map(|daily| daily * DAYS_PER_MONTH))
            .filter(|budget| *budget > 0.0)
    }
}
