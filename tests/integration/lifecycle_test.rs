#![allow(clippy::expect_used)]

use std::sync::Arc;

use adsentry::application::error::EngineError;
use adsentry::application::services::lifecycle::AlertLifecycle;
use adsentry::domain::entities::alert::{Alert, AlertCandidate, AlertDetail, RoasDropDetail};
use adsentry::domain::ports::store::{AlertFilter, AlertStore, Pagination};
use adsentry::domain::value_objects::alert_status::AlertStatus;
use adsentry::domain::value_objects::alert_type::AlertType;
use adsentry::domain::value_objects::priority::Priority;
use adsentry::infrastructure::persistence::in_memory_store::InMemoryStore;
use adsentry::infrastructure::persistence::sqlite_store::SqliteStore;
use chrono::{Duration, Utc};

fn roas_alert(campaign_id: &str, recipient_id: &str, priority: Priority, age_minutes: i64) -> Alert {
    let candidate = AlertCandidate {
        alert_type: AlertType::RoasDrop,
        priority,
        title: "ROAS dropped".to_string(),
        message: "ROAS fell from 3.00 to 1.80".to_string(),
        threshold: 20.0,
        current_value: 1.8,
        previous_value: Some(3.0),
        magnitude: 40.0,
        detail: AlertDetail::RoasDrop(RoasDropDetail {
            current_roas: 1.8,
            previous_roas: 3.0,
            drop_percent: 40.0,
        }),
    };
    Alert::from_candidate(
        candidate,
        campaign_id,
        recipient_id,
        Utc::now() - Duration::minutes(age_minutes),
    )
}

/// Runs `check` once against the in-memory store and once against SQLite.
async fn for_each_store<F, Fut>(check: F)
where
    F: Fn(Arc<dyn AlertStore>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    check(Arc::new(InMemoryStore::new())).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("alerts.db");
    let sqlite = SqliteStore::new(path.to_str().expect("path")).expect("open sqlite");
    check(Arc::new(sqlite)).await;
}

#[tokio::test]
async fn active_alert_cannot_be_deleted_until_closed() {
    for_each_store(|store| async move {
        let alert = store
            .create(&roas_alert("cmp-1", "op-1", Priority::High, 0))
            .await
            .expect("create");
        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        let id = alert.id.to_string();

        let err = lifecycle.delete("op-1", &id).await.expect_err("active delete");
        assert!(matches!(err, EngineError::Precondition(_)));
        assert!(store.get(alert.id).await.expect("get").is_some());

        let resolved = lifecycle.resolve("op-1", &id).await.expect("resolve");
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        lifecycle.delete("op-1", &id).await.expect("delete");
        assert!(store.get(alert.id).await.expect("get").is_none());
    })
    .await;
}

#[tokio::test]
async fn acknowledged_alert_still_needs_closing() {
    for_each_store(|store| async move {
        let alert = store
            .create(&roas_alert("cmp-1", "op-1", Priority::High, 0))
            .await
            .expect("create");
        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        let id = alert.id.to_string();

        lifecycle.acknowledge("op-1", &id).await.expect("ack");
        assert!(matches!(
            lifecycle.delete("op-1", &id).await,
            Err(EngineError::Precondition(_))
        ));
        let dismissed = lifecycle.dismiss("op-1", &id).await.expect("dismiss");
        assert_eq!(dismissed.status, AlertStatus::Dismissed);
        lifecycle.delete("op-1", &id).await.expect("delete");
    })
    .await;
}

#[tokio::test]
async fn closed_alert_cannot_be_reopened() {
    for_each_store(|store| async move {
        let alert = store
            .create(&roas_alert("cmp-1", "op-1", Priority::High, 0))
            .await
            .expect("create");
        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        let id = alert.id.to_string();

        lifecycle.resolve("op-1", &id).await.expect("resolve");
        assert!(lifecycle.acknowledge("op-1", &id).await.is_err());
        assert!(lifecycle.dismiss("op-1", &id).await.is_err());
    })
    .await;
}

#[tokio::test]
async fn other_recipients_are_refused() {
    for_each_store(|store| async move {
        let alert = store
            .create(&roas_alert("cmp-1", "op-1", Priority::High, 0))
            .await
            .expect("create");
        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        let id = alert.id.to_string();

        assert!(matches!(
            lifecycle.mark_as_read("op-2", &id).await,
            Err(EngineError::Permission(_))
        ));
        assert!(matches!(
            lifecycle.resolve("op-2", &id).await,
            Err(EngineError::Permission(_))
        ));
        let stored = store.get(alert.id).await.expect("get").expect("alert");
        assert!(!stored.is_read);
        assert_eq!(stored.status, AlertStatus::Active);
    })
    .await;
}

#[tokio::test]
async fn listing_puts_unread_then_priority_then_newest_first() {
    for_each_store(|store| async move {
        let old_low = store
            .create(&roas_alert("cmp-1", "op-1", Priority::Low, 30))
            .await
            .expect("create");
        let new_low = store
            .create(&roas_alert("cmp-2", "op-1", Priority::Low, 5))
            .await
            .expect("create");
        let critical = store
            .create(&roas_alert("cmp-3", "op-1", Priority::Critical, 60))
            .await
            .expect("create");
        let read_critical = store
            .create(&roas_alert("cmp-4", "op-1", Priority::Critical, 1))
            .await
            .expect("create");
        store
            .create(&roas_alert("cmp-5", "op-2", Priority::Critical, 1))
            .await
            .expect("create");

        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        lifecycle
            .mark_as_read("op-1", &read_critical.id.to_string())
            .await
            .expect("read");

        let page = lifecycle
            .list("op-1", AlertFilter::default(), Pagination::default())
            .await
            .expect("list");
        assert_eq!(page.total, 4);
        let order: Vec<_> = page.alerts.iter().map(|a| a.id).collect();
        assert_eq!(
            order,
            vec![critical.id, new_low.id, old_low.id, read_critical.id]
        );

        let second = lifecycle
            .list(
                "op-1",
                AlertFilter::default(),
                Pagination {
                    page: 2,
                    per_page: 3,
                },
            )
            .await
            .expect("page 2");
        assert_eq!(second.total, 4);
        assert_eq!(second.alerts.len(), 1);
        assert_eq!(second.alerts[0].id, read_critical.id);
    })
    .await;
}

#[tokio::test]
async fn read_all_and_stats_cover_only_the_recipient() {
    for_each_store(|store| async move {
        for (campaign, priority) in [("cmp-1", Priority::High), ("cmp-2", Priority::Medium)] {
            store
                .create(&roas_alert(campaign, "op-1", priority, 0))
                .await
                .expect("create");
        }
        store
            .create(&roas_alert("cmp-3", "op-2", Priority::Critical, 0))
            .await
            .expect("create");

        let lifecycle = AlertLifecycle::new(Arc::clone(&store));
        let before = lifecycle.stats("op-1", 30).await.expect("stats");
        assert_eq!(before.total, 2);
        assert_eq!(before.unread, 2);
        assert_eq!(before.by_status.get(&AlertStatus::Active), Some(&2));
        assert_eq!(before.by_priority.get(&Priority::Critical), None);
        assert_eq!(before.by_type.get(&AlertType::RoasDrop), Some(&2));

        assert_eq!(lifecycle.mark_all_as_read("op-1").await.expect("read all"), 2);
        assert_eq!(lifecycle.mark_all_as_read("op-1").await.expect("again"), 0);
        assert_eq!(lifecycle.stats("op-1", 30).await.expect("stats").unread, 0);
        assert_eq!(lifecycle.stats("op-2", 30).await.expect("stats").unread, 1);
    })
    .await;
}
