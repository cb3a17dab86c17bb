use chrono::{Datelike, NaiveDate};

use crate::domain::entities::alert::{AlertCandidate, AlertDetail, BurnRateDetail};
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::thresholds::ThresholdSet;

use super::classifier::classify;
use super::{round2, DetectionInput, Detector};

/// Number of days in the month containing `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map_or(31, |last| last.day())
}

/// Result of the month-to-date pacing math, shared with the message text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnProjection {
    pub expected_fraction: f64,
    pub expected_spend: f64,
    pub burn_rate: f64,
    pub projected_monthly_spend: f64,
    pub projected_overspend: f64,
}

#[must_use]
pub fn project(
    monthly_budget: f64,
    actual_spend: f64,
    day_of_month: u32,
    days_in_month: u32,
) -> Option<BurnProjection> {
    if monthly_budget <= 0.0 || day_of_month == 0 || days_in_month == 0 {
        return None;
    }
    let expected_fraction = f64::from(day_of_month) / f64::from(days_in_month);
    let expected_spend = monthly_budget * expected_fraction;
    let burn_rate = actual_spend / expected_spend;
    let projected_monthly_spend = actual_spend / expected_fraction;
    Some(BurnProjection {
        expected_fraction,
        expected_spend,
        burn_rate,
        projected_monthly_spend,
        projected_overspend: projected_monthly_spend - monthly_budget,
    })
}

pub struct BurnRateDetector;

impl Detector for BurnRateDetector {
    fn kind(&self) -> AlertType {
        AlertType::BurnRate
    }

    fn detect(
        &self,
        input: &DetectionInput<'_>,
        thresholds: &ThresholdSet,
    ) -> Option<AlertCandidate> {
        let monthly_budget = input.campaign.effective_monthly_budget()?;
        let spend = input.metrics.month_to_date.as_ref()?.cost;
        let day = input.as_of.day();
        let days = days_in_month(input.as_of);

        let p = project(monthly_budget, spend, day, days)?;
        if p.burn_rate < thresholds.burn_rate_threshold {
            return None;
        }

        Some(AlertCandidate {
            alert_type: AlertType::BurnRate,
            priority: classify(AlertType::BurnRate, p.burn_rate),
            title: format!(
                "Budget burning at {:.2}x pace on {}",
                p.burn_rate, input.campaign.name
            ),
            message: format!(
                "Spent {spend:.2} of a {monthly_budget:.2} monthly budget by day {day}/{days} \
                 (expected {:.2}). At this pace the month ends at {:.2}, {:.2} over budget.",
                p.expected_spend, p.projected_monthly_spend, p.projected_overspend
            ),
            threshold: thresholds.burn_rate_threshold,
            current_value: round2(p.burn_rate),
            previous_value: None,
            magnitude: p.burn_rate,
            detail: AlertDetail::BurnRate(BurnRateDetail {
                monthly_budget: round2(monthly_budget),
                month_to_date_spend: round2(spend),
                expected_spend: round2(p.expected_spend),
                burn_rate: round2(p.burn_rate),
                day_of_month: day,
                days_in_month: days,
                projected_monthly_spend: round2(p.projected_monthly_spend),
                projected_overspend: round2(p.projected_overspend),
            }),
        })
    }
}
