use crate::domain::entities::alert::{AlertCandidate, AlertDetail, CtrDeclineDetail};
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

use super::classifier::classify;
use super::{pct_change, round2, DetectionInput, Detector};

/// Flags a sustained week-over-week CTR decline.
///
/// The weekly series is most-recent-first. Starting from the latest week,
/// each week counts while its CTR is more than `ctr_drop_min_percent` below
/// the week before it; the walk stops at the first week that does not
/// qualify. `ctr_drop_weeks - 1` consecutive qualifying weeks trigger.
pub struct CtrDeclineDetector;

impl Detector for CtrDeclineDetector {
    fn kind(&self) -> AlertType {
        AlertType::CtrDecline
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let weekly = &input.metrics.weekly;
        let min_weeks = thresholds.ctr_drop_weeks.max(2);
        if weekly.len() < min_weeks {
            return None;
        }

        let mut consecutive = 0usize;
        for pair in weekly.windows(2) {
            let (Some(newer), Some(older)) = (pair[0].ctr(), pair[1].ctr()) else {
                break;
            };
            if pct_change(newer, older) < -thresholds.ctr_drop_min_percent {
                consecutive += 1;
            } else {
                break;
            }
        }

        if consecutive < min_weeks - 1 {
            return None;
        }

        let window: Vec<f64> = weekly[..=consecutive]
            .iter()
            .filter_map(|week| week.ctr().map(round2))
            .collect();
        let latest = weekly[0].ctr()?;
        let oldest = weekly[consecutive].ctr()?;
        let total_drop = pct_change(latest, oldest).abs();

        Some(AlertCandidate {
            alert_type: AlertType::CtrDecline,
            priority: classify(AlertType::CtrDecline, total_drop),
            title: format!(
                "CTR declining for {consecutive} weeks on {}",
                input.campaign.name
            ),
            message: format!(
                "Click-through rate fell from {oldest:.2}% to {latest:.2}% over {consecutive} \
                 consecutive weeks ({total_drop:.1}% overall, each week down more than {:.0}%). \
                 Ad creative may be fatiguing.",
                thresholds.ctr_drop_min_percent
            ),
            threshold: thresholds.ctr_drop_min_percent,
            current_value: round2(latest),
            previous_value: Some(round2(oldest)),
            magnitude: total_drop,
            detail: AlertDetail::CtrDecline(CtrDeclineDetail {
                weekly_ctr: window,
                consecutive_weeks: consecutive,
                total_drop_percent: round2(total_drop),
            }),
        })
    }
}
