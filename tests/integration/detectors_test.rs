#![allow(clippy::expect_used)]

use adsentry::domain::detectors::{DetectionInput, DetectorSet};
use adsentry::domain::entities::alert::{AlertCandidate, AlertDetail};
use adsentry::domain::entities::campaign::Campaign;
use adsentry::domain::entities::snapshot::CampaignMetrics;
use adsentry::domain::value_objects::alert_type::AlertType;
use adsentry::domain::value_objects::priority::Priority;
use adsentry::domain::value_objects::thresholds::ThresholdSet;
use adsentry::infrastructure::workspace::json_workspace::WorkspaceData;
use chrono::NaiveDate;

fn load_fixture(name: &str) -> WorkspaceData {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let json = std::fs::read_to_string(&path).expect("Failed to read fixture");
    serde_json::from_str(&json).expect("Failed to parse fixture")
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("date")
}

fn campaign_and_metrics(data: &WorkspaceData, id: &str) -> (Campaign, CampaignMetrics) {
    let campaign = data
        .campaigns
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .expect("campaign in fixture");
    let series = data.metrics.get(id).cloned().expect("metrics in fixture");
    let metrics = CampaignMetrics {
        current: series.current.expect("current snapshot"),
        previous: series.previous,
        weekly: series.weekly,
        month_to_date: series.month_to_date,
    };
    (campaign, metrics)
}

fn detect(id: &str, set: DetectorSet, thresholds: &ThresholdSet) -> Vec<AlertCandidate> {
    let data = load_fixture("workspace.json");
    let (campaign, metrics) = campaign_and_metrics(&data, id);
    let input = DetectionInput {
        campaign: &campaign,
        metrics: &metrics,
        as_of: june(10),
    };
    set.run(&input, thresholds)
}

#[test]
fn roas_drop_from_three_to_one_point_eight_is_high() {
    let candidates = detect("cmp-roas", DetectorSet::full(), &ThresholdSet::default());
    assert_eq!(candidates.len(), 1, "only the ROAS detector should fire");

    let roas = &candidates[0];
    assert_eq!(roas.alert_type, AlertType::RoasDrop);
    assert_eq!(roas.priority, Priority::High);
    assert!((roas.magnitude - 40.0).abs() < 1e-6);
    assert!((roas.current_value - 1.8).abs() < f64::EPSILON);
    assert_eq!(roas.previous_value, Some(3.0));
    assert!(matches!(
        roas.detail,
        AlertDetail::RoasDrop(ref d) if (d.drop_percent - 40.0).abs() < f64::EPSILON
    ));
}

#[test]
fn tenant_overrides_apply_on_top_of_defaults() {
    let data = load_fixture("workspace.json");
    let overrides = data.overrides.get("tenant-acme").expect("tenant overrides");
    let thresholds = ThresholdSet::default().with_overrides(overrides);
    assert!((thresholds.cpa_above_target_percent - 40.0).abs() < f64::EPSILON);

    let candidates = detect("cmp-roas", DetectorSet::full(), &thresholds);
    assert_eq!(candidates.len(), 1);
}

#[test]
fn burn_rate_one_point_six_is_critical_with_projection() {
    let candidates = detect("cmp-burn", DetectorSet::full(), &ThresholdSet::default());
    let burn = candidates
        .iter()
        .find(|c| c.alert_type == AlertType::BurnRate)
        .expect("burn rate candidate");

    assert_eq!(burn.priority, Priority::Critical);
    assert!((burn.current_value - 1.6).abs() < f64::EPSILON);
    let AlertDetail::BurnRate(ref detail) = burn.detail else {
        panic!("expected burn rate detail");
    };
    assert_eq!(detail.day_of_month, 10);
    assert_eq!(detail.days_in_month, 30);
    assert!((detail.expected_spend - 1000.0).abs() < f64::EPSILON);
    assert!((detail.projected_monthly_spend - 4800.0).abs() < f64::EPSILON);
    assert!((detail.projected_overspend - 1800.0).abs() < f64::EPSILON);
}

#[test]
fn burn_rate_survives_critical_only_pass() {
    let thresholds = ThresholdSet::default().tightened(1.5, 60.0);
    let candidates = detect("cmp-burn", DetectorSet::critical_only(), &thresholds);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].alert_type, AlertType::BurnRate);
}

#[test]
fn critical_only_pass_ignores_roas() {
    let thresholds = ThresholdSet::default().tightened(1.5, 60.0);
    assert!(detect("cmp-roas", DetectorSet::critical_only(), &thresholds).is_empty());
}

#[test]
fn ctr_two_qualifying_weeks_trigger_at_boundary() {
    let candidates = detect("cmp-ctr", DetectorSet::full(), &ThresholdSet::default());
    let ctr = candidates
        .iter()
        .find(|c| c.alert_type == AlertType::CtrDecline)
        .expect("ctr candidate");
    let AlertDetail::CtrDecline(ref detail) = ctr.detail else {
        panic!("expected ctr detail");
    };
    assert_eq!(detail.consecutive_weeks, 2);
    assert_eq!(detail.weekly_ctr, vec![1.37, 1.62, 1.84]);
}

#[test]
fn ctr_single_qualifying_week_does_not_trigger() {
    let candidates = detect("cmp-ctr-flat", DetectorSet::full(), &ThresholdSet::default());
    assert!(candidates
        .iter()
        .all(|c| c.alert_type != AlertType::CtrDecline));
}

#[test]
fn paused_campaign_is_not_eligible() {
    let data = load_fixture("workspace.json");
    let paused = data
        .campaigns
        .iter()
        .find(|c| c.id == "cmp-paused")
        .expect("paused campaign");
    assert!(!paused.is_eligible());
}
