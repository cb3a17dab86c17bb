use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Point-in-time performance metrics for one campaign over one period.
///
/// Raw counters are stored; ratios are derived on demand and are `None`
/// when their denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub cost: f64,
    pub conversions: f64,
    pub conversion_value: f64,
    /// Share of eligible impressions lost because the budget ran out (fraction or percent)
    #[serde(default)]
    pub lost_impression_share_budget: Option<f64>,
    /// Share of eligible impressions lost to ad rank (fraction or percent)
    #[serde(default)]
    pub lost_impression_share_rank: Option<f64>,
}

impl MetricsSnapshot {
    /// Click-through rate in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ctr(&self) -> Option<f64> {
        (self.impressions > 0).then(|| self.clicks as f64 / self.impressions as f64 * 100.0)
    }

    #[must_use]
    pub fn cpa(&self) -> Option<f64> {
        (self.conversions > 0.0).then(|| self.cost / self.conversions)
    }

    #[must_use]
    pub fn roas(&self) -> Option<f64> {
        (self.cost > 0.0).then(|| self.conversion_value / self.cost)
    }

    #[must_use]
    pub fn lost_budget_percent(&self) -> Option<f64> {
        self.lost_impression_share_budget.map(normalize_share)
    }

    #[must_use]
    pub fn lost_rank_percent(&self) -> Option<f64> {
        self.lost_impression_share_rank.map(normalize_share)
    }
}

/// Everything the detector set needs for one campaign, fetched fresh per run.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignMetrics {
    pub current: MetricsSnapshot,
    /// Same-length window `lookback_days` earlier
    pub previous: Option<MetricsSnapshot>,
    /// Weekly series, most recent first; may be shorter than requested
    pub weekly: Vec<MetricsSnapshot>,
    /// Spend accumulated since the first day of the current month
    pub month_to_date: Option<MetricsSnapshot>,
}

impl CampaignMetrics {
    #[must_use]
    pub fn current_only(current: MetricsSnapshot) -> Self {
        Self {
            current,
            previous: None,
            weekly: Vec::new(),
            month_to_date: None,
        }
    }
}

/// Platforms report impression share either as a fraction or as a percent.
fn normalize_share(value: f64) -> f64 {
    if value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}
