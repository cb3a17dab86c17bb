use crate::domain::entities::alert::{AlertCandidate, AlertDetail, ImpressionLossDetail};
use crate::domain::entities::snapshot::MetricsSnapshot;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

use super::classifier::classify;
use super::{round2, DetectionInput, Detector};

fn loss_candidate(
    kind: AlertType,
    input: &DetectionInput<'_>,
    lost_percent: f64,
    threshold: f64,
) -> Option<AlertCandidate> {
    if lost_percent < threshold {
        return None;
    }
    let current: &MetricsSnapshot = &input.metrics.current;
    let detail = ImpressionLossDetail {
        lost_percent: round2(lost_percent),
        impressions: current.impressions,
        cost: round2(current.cost),
    };
    let (cause, hint, detail) = match kind {
        AlertType::ImpressionLossBudget => (
            "budget",
            "Consider raising the daily budget or narrowing targeting.",
            AlertDetail::ImpressionLossBudget(detail),
        ),
        _ => (
            "ad rank",
            "Review bids and ad quality to recover auction position.",
            AlertDetail::ImpressionLossRank(detail),
        ),
    };

    Some(AlertCandidate {
        alert_type: kind,
        priority: classify(kind, lost_percent),
        title: format!(
            "{lost_percent:.1}% of impressions lost to {cause} on {}",
            input.campaign.name
        ),
        message: format!(
            "The campaign is losing {lost_percent:.1}% of eligible impressions to {cause} \
             (threshold {threshold:.0}%). {hint}"
        ),
        threshold,
        current_value: round2(lost_percent),
        previous_value: None,
        magnitude: lost_percent,
        detail,
    })
}

pub struct BudgetLossDetector;

impl Detector for BudgetLossDetector {
    fn kind(&self) -> AlertType {
        AlertType::ImpressionLossBudget
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let lost = input.metrics.current.lost_budget_percent()?;
        loss_candidate(
            AlertType::ImpressionLossBudget,
            input,
            lost,
            thresholds.impression_loss_budget_percent,
        )
    }
}

pub struct RankLossDetector;

impl Detector for RankLossDetector {
    fn kind(&self) -> AlertType {
        AlertType::ImpressionLossRank
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let lost = input.metrics.current.lost_rank_percent()?;
        loss_candidate(
            AlertType::ImpressionLossRank,
            input,
            lost,
            thresholds.impression_loss_rank_percent,
        )
    }
}
