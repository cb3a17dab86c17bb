use crate::domain::entities::alert::{AlertCandidate, AlertDetail, RoasDropDetail};
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

use super::classifier::classify;
use super::{pct_change, round2, DetectionInput, Detector};

pub struct RoasDropDetector;

impl Detector for RoasDropDetector {
    fn kind(&self) -> AlertType {
        AlertType::RoasDrop
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let current = input.metrics.current.roas()?;
        let previous = input.metrics.previous.as_ref()?.roas()?;

        let change = pct_change(current, previous);
        if change > -thresholds.roas_drop_percent {
            return None;
        }
        let drop = change.abs();

        Some(AlertCandidate {
            alert_type: AlertType::RoasDrop,
            priority: classify(AlertType::RoasDrop, drop),
            title: format!("ROAS dropped {drop:.1}% on {}", input.campaign.name),
            message: format!(
                "ROAS fell from {previous:.2} to {current:.2} ({drop:.1}% drop, threshold {:.0}%).",
                thresholds.roas_drop_percent
            ),
            threshold: thresholds.roas_drop_percent,
            current_value: round2(current),
            previous_value: Some(round2(previous)),
            magnitude: drop,
            detail: AlertDetail::RoasDrop(RoasDropDetail {
                current_roas: round2(current),
                previous_roas: round2(previous),
                drop_percent: round2(drop),
            }),
        })
    }
}
