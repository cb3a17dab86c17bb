use crate::domain::entities::alert::{AlertCandidate, AlertDetail, CpaHighDetail};
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

use super::classifier::classify;
use super::{pct_change, round2, DetectionInput, Detector};

pub struct CpaHighDetector;

impl Detector for CpaHighDetector {
    fn kind(&self) -> AlertType {
        AlertType::CpaHigh
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let target = thresholds
            .target_cpa
            .or(input.campaign.target_cpa)
            .filter(|t| *t > 0.0)?;
        let current = input.metrics.current.cpa()?;

        let above = pct_change(current, target);
        if above <= thresholds.cpa_above_target_percent {
            return None;
        }

        Some(AlertCandidate {
            alert_type: AlertType::CpaHigh,
            priority: classify(AlertType::CpaHigh, above),
            title: format!("CPA {above:.1}% above target on {}", input.campaign.name),
            message: format!(
                "Cost per acquisition is {current:.2} against a target of {target:.2} \
                 ({above:.1}% above, threshold {:.0}%).",
                thresholds.cpa_above_target_percent
            ),
            threshold: thresholds.cpa_above_target_percent,
            current_value: round2(current),
            previous_value: Some(round2(target)),
            magnitude: above,
            detail: AlertDetail::CpaHigh(CpaHighDetail {
                current_cpa: round2(current),
                target_cpa: round2(target),
                above_target_percent: round2(above),
            }),
        })
    }
}
