pub mod burn_rate;
pub mod classifier;
pub mod cpa;
pub mod ctr_trend;
pub mod impression_loss;
pub mod roas;

use chrono::NaiveDate;

use crate::domain::entities::alert::AlertCandidate;
use crate::domain::entities::campaign::Campaign;
use crate::domain::entities::snapshot::CampaignMetrics;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Everything one detector call may look at.
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub campaign: &'a Campaign,
    pub metrics: &'a CampaignMetrics,
    /// Calendar day the analysis runs for (drives month-to-date math)
    pub as_of: NaiveDate,
}

/// A deterministic anomaly check. Detectors are pure: metrics and thresholds
/// in, at most one candidate out. No I/O.
pub trait Detector: Send + Sync {
    fn kind(&self) -> AlertType;

    fn detect(&self, input: &DetectionInput<'_>, thresholds: &ThresholdSet)
        -> Option<AlertCandidate>;
}

/// Percentage change from `previous` to `current`. A zero baseline counts as
/// +100% if anything appeared, 0% otherwise.
#[must_use]
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Two decimals are enough for stored values and keep re-detections stable.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Static dispatch from the closed set of alert kinds to their detector.
#[must_use]
pub fn detector_for(kind: AlertType) -> &'static dyn Detector {
    match kind {
        AlertType::RoasDrop => &roas::RoasDropDetector,
        AlertType::CpaHigh => &cpa::CpaHighDetector,
        AlertType::ImpressionLossBudget => &impression_loss::BudgetLossDetector,
        AlertType::ImpressionLossRank => &impression_loss::RankLossDetector,
        AlertType::CtrDecline => &ctr_trend::CtrDeclineDetector,
        AlertType::BurnRate => &burn_rate::BurnRateDetector,
    }
}

/// Fast-moving emergencies checked between full runs.
pub const CRITICAL_KINDS: [AlertType; 2] = [AlertType::BurnRate, AlertType::ImpressionLossBudget];

/// Runs a fixed list of detectors against one campaign.
#[derive(Debug, Clone, Copy)]
pub struct DetectorSet {
    kinds: &'static [AlertType],
}

impl DetectorSet {
    /// All six detectors.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            kinds: &AlertType::ALL,
        }
    }

    /// Burn rate and budget-caused impression loss only.
    #[must_use]
    pub const fn critical_only() -> Self {
        Self {
            kinds: &CRITICAL_KINDS,
        }
    }

    #[must_use]
    pub const fn kinds(&self) -> &'static [AlertType] {
        self.kinds
    }

    #[must_use]
    pub fn includes(&self, kind: AlertType) -> bool {
        self.kinds.contains(&kind)
    }

    /// Evaluate every detector in the set, returning candidates sorted by
    /// priority (critical first).
    #[must_use]
    pub fn run(&self, input: &DetectionInput<'_>, thresholds: &ThresholdSet) -> Vec<AlertCandidate> {
        let mut candidates: Vec<AlertCandidate> = self
            .kinds
            .iter()
            .filter_map(|kind| detector_for(*kind).detect(input, thresholds))
            .collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }
}
