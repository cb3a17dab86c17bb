use serde::{Deserialize, Serialize};

/// Resolved set of detector thresholds for one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// ROAS drop (percent vs previous period) that triggers an alert
    pub roas_drop_percent: f64,
    /// CPA excess (percent above target) that triggers an alert
    pub cpa_above_target_percent: f64,
    /// Impression share lost to budget (percent) that triggers an alert
    pub impression_loss_budget_percent: f64,
    /// Impression share lost to rank (percent) that triggers an alert
    pub impression_loss_rank_percent: f64,
    /// Minimum length of the weekly CTR series; `ctr_drop_weeks - 1` consecutive drops trigger
    pub ctr_drop_weeks: usize,
    /// Minimum week-over-week CTR drop (percent) for a week to count as declining
    pub ctr_drop_min_percent: f64,
    /// Actual / expected month-to-date spend ratio that triggers an alert
    pub burn_rate_threshold: f64,
    /// Target CPA override, takes precedence over the campaign's own target
    pub target_cpa: Option<f64>,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            roas_drop_percent: 20.0,
            cpa_above_target_percent: 20.0,
            impression_loss_budget_percent: 40.0,
            impression_loss_rank_percent: 50.0,
            ctr_drop_weeks: 3,
            ctr_drop_min_percent: 10.0,
            burn_rate_threshold: 1.3,
            target_cpa: None,
        }
    }
}

/// Per-campaign (tenant-owned) overrides; absent fields fall back to the base set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default)]
    pub roas_drop_percent: Option<f64>,
    #[serde(default)]
    pub cpa_above_target_percent: Option<f64>,
    #[serde(default)]
    pub impression_loss_budget_percent: Option<f64>,
    #[serde(default)]
    pub impression_loss_rank_percent: Option<f64>,
    #[serde(default)]
    pub ctr_drop_weeks: Option<usize>,
    #[serde(default)]
    pub ctr_drop_min_percent: Option<f64>,
    #[serde(default)]
    pub burn_rate_threshold: Option<f64>,
    #[serde(default)]
    pub target_cpa: Option<f64>,
}

impl ThresholdSet {
    /// Pull every value into its usable range: percents into 0..=100 (CPA
    /// excess only non-negative), at least two CTR weeks, a positive burn rate.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            roas_drop_percent: self.roas_drop_percent.clamp(0.0, 100.0),
            cpa_above_target_percent: self.cpa_above_target_percent.max(0.0),
            impression_loss_budget_percent: self.impression_loss_budget_percent.clamp(0.0, 100.0),
            impression_loss_rank_percent: self.impression_loss_rank_percent.clamp(0.0, 100.0),
            // A trend needs at least two points
            ctr_drop_weeks: self.ctr_drop_weeks.max(2),
            ctr_drop_min_percent: self.ctr_drop_min_percent.clamp(0.0, 100.0),
            burn_rate_threshold: if self.burn_rate_threshold > 0.0 {
                self.burn_rate_threshold
            } else {
                Self::default().burn_rate_threshold
            },
            target_cpa: self.target_cpa.filter(|cpa| *cpa > 0.0),
        }
    }

    /// Layer tenant overrides on top of this set. Out-of-range overrides are
    /// clamped; a non-positive burn rate or target CPA is ignored.
    #[must_use]
    pub fn with_overrides(&self, overrides: &ThresholdOverrides) -> Self {
        Self {
            roas_drop_percent: overrides.roas_drop_percent.unwrap_or(self.roas_drop_percent),
            cpa_above_target_percent: overrides
                .cpa_above_target_percent
                .unwrap_or(self.cpa_above_target_percent),
            impression_loss_budget_percent: overrides
                .impression_loss_budget_percent
                .unwrap_or(self.impression_loss_budget_percent),
            impression_loss_rank_percent: overrides
                .impression_loss_rank_percent
                .unwrap_or(self.impression_loss_rank_percent),
            ctr_drop_weeks: overrides.ctr_drop_weeks.unwrap_or(self.ctr_drop_weeks),
            ctr_drop_min_percent: overrides
                .ctr_drop_min_percent
                .unwrap_or(self.ctr_drop_min_percent),
            burn_rate_threshold: overrides
                .burn_rate_threshold
                .filter(|rate| *rate > 0.0)
                .unwrap_or(self.burn_rate_threshold),
            target_cpa: overrides
                .target_cpa
                .filter(|cpa| *cpa > 0.0)
                .or(self.target_cpa),
        }
        .sanitized()
    }

    /// Tighten the emergency thresholds for the critical-only pass. A tenant
    /// override that is already stricter is kept.
    #[must_use]
    pub fn tightened(&self, burn_rate_threshold: f64, impression_loss_budget_percent: f64) -> Self {
        Self {
            burn_rate_threshold: self.burn_rate_threshold.max(burn_rate_threshold),
            impression_loss_budget_percent: self
                .impression_loss_budget_percent
                .max(impression_loss_budget_percent),
            ..self.clone()
        }
    }
}
