#![allow(clippy::expect_used)]

//! Several engine processes pointed at one database file. Each `SqliteStore`
//! handle owns its own connection and each `Deduplicator` its own lock map,
//! so only the database can keep the one-active-alert rule.

use std::sync::Arc;

use adsentry::application::services::dedup::{Deduplicator, UpsertOutcome};
use adsentry::domain::entities::alert::{AlertCandidate, AlertDetail, BurnRateDetail};
use adsentry::domain::ports::store::{AlertFilter, AlertStore, Pagination};
use adsentry::domain::value_objects::alert_status::AlertStatus;
use adsentry::domain::value_objects::alert_type::AlertType;
use adsentry::domain::value_objects::priority::Priority;
use adsentry::infrastructure::persistence::sqlite_store::SqliteStore;

const HANDLES: usize = 4;
const ROUNDS: usize = 25;

fn burn_rate(rate: f64) -> AlertCandidate {
    AlertCandidate {
        alert_type: AlertType::BurnRate,
        priority: Priority::High,
        title: "Budget pacing ahead".to_string(),
        message: format!("Spending at {rate:.2}x the expected pace"),
        threshold: 1.5,
        current_value: rate,
        previous_value: None,
        magnitude: (rate - 1.0) * 100.0,
        detail: AlertDetail::BurnRate(BurnRateDetail {
            monthly_budget: 3000.0,
            month_to_date_spend: rate * 1000.0,
            expected_spend: 1000.0,
            burn_rate: rate,
            day_of_month: 10,
            days_in_month: 30,
            projected_monthly_spend: rate * 3000.0,
            projected_overspend: (rate - 1.0) * 3000.0,
        }),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_handles_store_one_active_alert_per_campaign() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("alerts.db");
    let path = path.to_str().expect("path");

    let stores: Vec<Arc<SqliteStore>> = (0..HANDLES)
        .map(|_| Arc::new(SqliteStore::new(path).expect("open handle")))
        .collect();

    for round in 0..ROUNDS {
        let campaign = format!("cmp-{round}");
        let mut tasks = tokio::task::JoinSet::new();
        for store in &stores {
            let dedup = Deduplicator::new(Arc::clone(store) as Arc<dyn AlertStore>);
            let campaign = campaign.clone();
            tasks.spawn(async move { dedup.upsert(burn_rate(1.8), &campaign, "op-1").await });
        }

        let mut created = 0;
        while let Some(joined) = tasks.join_next().await {
            if matches!(joined.expect("join").expect("upsert"), UpsertOutcome::Created(_)) {
                created += 1;
            }
        }
        assert_eq!(created, 1, "round {round} created {created} alerts");
    }

    let page = stores[0]
        .list(
            &AlertFilter {
                status: Some(AlertStatus::Active),
                ..AlertFilter::default()
            },
            &Pagination::all(),
        )
        .await
        .expect("list");
    assert_eq!(page.total, ROUNDS);
    for round in 0..ROUNDS {
        let campaign = format!("cmp-{round}");
        let count = page.alerts.iter().filter(|a| a.campaign_id == campaign).count();
        assert_eq!(count, 1, "{campaign} has {count} active alerts");
    }
}
