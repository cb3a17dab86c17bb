#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adsentry::application::services::analysis::{AnalysisService, AnalysisSettings};
use adsentry::application::services::dispatcher::{
    ChannelOutcome, Dispatcher, EVENT_ALERT_NEW, EVENT_CHAT_MESSAGE,
};
use adsentry::domain::entities::alert::Alert;
use adsentry::domain::entities::campaign::{Campaign, CampaignStatus};
use adsentry::domain::entities::snapshot::MetricsSnapshot;
use adsentry::domain::ports::directory::CampaignDirectory;
use adsentry::domain::ports::metrics::MetricsProvider;
use adsentry::domain::ports::notifier::{
    ChatPoster, EmailSender, NotificationError, RealtimePublisher,
};
use adsentry::domain::ports::store::{AlertFilter, AlertStore, Pagination};
use adsentry::domain::value_objects::alert_type::AlertType;
use adsentry::infrastructure::persistence::in_memory_store::InMemoryStore;
use adsentry::infrastructure::workspace::json_workspace::{
    CampaignSeries, JsonWorkspace, WorkspaceData,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

// --- Channels ---

#[derive(Default)]
struct RecordingRealtime {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingRealtime {
    fn events(&self) -> Vec<(String, String)> {
        self.events.lock().expect("lock").clone()
    }
}

#[async_trait]
impl RealtimePublisher for RecordingRealtime {
    async fn publish(
        &self,
        scope: &str,
        event: &str,
        _payload: &Value,
    ) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("lock")
            .push((scope.to_string(), event.to_string()));
        Ok(())
    }
}

struct BrokenEmail;

#[async_trait]
impl EmailSender for BrokenEmail {
    async fn send_alert_email(&self, _alert: &Alert) -> Result<(), NotificationError> {
        Err(NotificationError::SendFailed("smtp 554".into()))
    }
}

struct RoomChat;

#[async_trait]
impl ChatPoster for RoomChat {
    async fn post_system_message(
        &self,
        campaign_id: &str,
        _alert: &Alert,
    ) -> Result<String, NotificationError> {
        Ok(format!("room-{campaign_id}"))
    }
}

// --- Workspace ---

fn snapshot(cost: f64, value: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        period_start: NaiveDate::from_ymd_opt(2024, 6, 3).expect("date"),
        period_end: NaiveDate::from_ymd_opt(2024, 6, 9).expect("date"),
        impressions: 20_000,
        clicks: 400,
        cost,
        conversions: 20.0,
        conversion_value: value,
        lost_impression_share_budget: None,
        lost_impression_share_rank: None,
    }
}

fn campaign(id: &str, recipient: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: format!("Campaign {id}"),
        tenant_id: "tenant-1".to_string(),
        recipient_id: recipient.to_string(),
        status: CampaignStatus::Active,
        tenant_active: true,
        daily_budget: None,
        monthly_budget: None,
        target_roas: None,
        target_cpa: None,
    }
}

/// `current_value` is the current ROAS; the previous window always sits at 3.0.
fn roas_series(current_roas: f64) -> CampaignSeries {
    CampaignSeries {
        current: Some(snapshot(1000.0, current_roas * 1000.0)),
        previous: Some(snapshot(1000.0, 3000.0)),
        ..CampaignSeries::default()
    }
}

fn workspace(entries: &[(&str, Option<f64>)]) -> WorkspaceData {
    let mut metrics = HashMap::new();
    let mut campaigns = Vec::new();
    for (id, roas) in entries {
        campaigns.push(campaign(id, "op-1"));
        if let Some(roas) = roas {
            metrics.insert((*id).to_string(), roas_series(*roas));
        }
    }
    WorkspaceData {
        campaigns,
        overrides: HashMap::new(),
        metrics,
    }
}

struct Pipeline {
    store: Arc<InMemoryStore>,
    realtime: Arc<RecordingRealtime>,
    service: AnalysisService,
}

fn pipeline(workspace: Arc<JsonWorkspace>) -> Pipeline {
    let store = Arc::new(InMemoryStore::new());
    let realtime = Arc::new(RecordingRealtime::default());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store) as Arc<dyn AlertStore>,
        Arc::clone(&realtime) as Arc<dyn RealtimePublisher>,
        Arc::new(BrokenEmail),
        Arc::new(RoomChat),
        Duration::from_secs(1),
    ));
    let service = AnalysisService::new(
        Arc::clone(&workspace) as Arc<dyn CampaignDirectory>,
        workspace as Arc<dyn MetricsProvider>,
        Arc::clone(&store) as Arc<dyn AlertStore>,
        dispatcher,
        AnalysisSettings::default(),
    );
    Pipeline {
        store,
        realtime,
        service,
    }
}

async fn all_alerts(store: &InMemoryStore) -> Vec<Alert> {
    store
        .list(&AlertFilter::default(), &Pagination::all())
        .await
        .expect("list")
        .alerts
}

fn write_workspace(path: &std::path::Path, data: &WorkspaceData) {
    std::fs::write(path, serde_json::to_string(data).expect("serialize")).expect("write");
}

// --- Properties ---

#[tokio::test]
async fn repeated_batches_keep_a_single_untouched_alert() {
    let p = pipeline(Arc::new(JsonWorkspace::from_data(workspace(&[(
        "cmp-a",
        Some(1.8),
    )]))));

    let first = p.service.run_batch().await.expect("first batch");
    assert_eq!(first.alerts_generated, 1);
    let stored = all_alerts(&p.store).await;
    assert_eq!(stored.len(), 1);
    let original = stored[0].clone();

    for _ in 0..3 {
        let again = p.service.run_batch().await.expect("batch");
        assert_eq!(again.alerts_generated, 0);
        assert_eq!(again.alerts_unchanged, 1);
    }

    let stored = all_alerts(&p.store).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, original.id);
    assert_eq!(stored[0].updated_at, original.updated_at);
}

#[tokio::test]
async fn moved_value_refreshes_alert_in_place() {
    let file = tempfile::NamedTempFile::new().expect("tempfile");
    write_workspace(file.path(), &workspace(&[("cmp-a", Some(1.8))]));
    let ws = JsonWorkspace::open(file.path().to_str().expect("path")).expect("open");
    let p = pipeline(Arc::new(ws));

    p.service.run_batch().await.expect("first batch");
    let original = all_alerts(&p.store).await.remove(0);
    assert!((original.current_value - 1.8).abs() < f64::EPSILON);

    // ROAS slides further, well past the 0.1 tolerance
    write_workspace(file.path(), &workspace(&[("cmp-a", Some(1.2))]));
    let summary = p.service.run_batch().await.expect("second batch");
    assert_eq!(summary.alerts_generated, 1);

    let stored = all_alerts(&p.store).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, original.id);
    assert!((stored[0].current_value - 1.2).abs() < f64::EPSILON);
    assert!(stored[0].updated_at >= original.updated_at);
}

#[tokio::test]
async fn failing_email_does_not_block_other_channels() {
    let p = pipeline(Arc::new(JsonWorkspace::from_data(workspace(&[(
        "cmp-a",
        Some(1.8),
    )]))));
    let summary = p.service.run_batch().await.expect("batch");
    assert_eq!(summary.errors, 0);

    let stored = all_alerts(&p.store).await;
    assert!(!stored[0].email_sent);
    assert!(stored[0].chat_sent);
    assert_eq!(summary.alerts[0].email_sent, stored[0].email_sent);

    let events = p.realtime.events();
    assert!(events.contains(&("user:op-1".to_string(), EVENT_ALERT_NEW.to_string())));
    assert!(events.contains(&(
        "conversation:room-cmp-a".to_string(),
        EVENT_CHAT_MESSAGE.to_string()
    )));
}

#[tokio::test]
async fn dispatch_report_names_each_channel() {
    let p = pipeline(Arc::new(JsonWorkspace::from_data(workspace(&[(
        "cmp-a",
        Some(1.8),
    )]))));
    // analyze stores without delivering
    let found = p.service.analyze_campaign("cmp-a").await.expect("analyze");
    assert_eq!(found.len(), 1);
    assert!(p.realtime.events().is_empty());

    let dispatcher = Dispatcher::new(
        Arc::clone(&p.store) as Arc<dyn AlertStore>,
        Arc::new(RecordingRealtime::default()),
        Arc::new(BrokenEmail),
        Arc::new(RoomChat),
        Duration::from_secs(1),
    );
    let report = dispatcher.dispatch(&found[0]).await;
    assert_eq!(report.realtime, ChannelOutcome::Delivered);
    assert!(matches!(report.email, ChannelOutcome::Failed(_)));
    assert_eq!(report.chat, ChannelOutcome::Delivered);
    assert!(!report.alert.email_sent);
    assert!(report.alert.chat_sent);
}

#[tokio::test]
async fn one_failing_campaign_does_not_abort_the_batch() {
    // cmp-a has no metrics recorded, so the provider rejects it
    let p = pipeline(Arc::new(JsonWorkspace::from_data(workspace(&[
        ("cmp-a", None),
        ("cmp-b", Some(1.8)),
    ]))));

    let summary = p.service.run_batch().await.expect("batch");
    assert_eq!(summary.campaigns_analyzed, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].campaign_id, "cmp-a");
    assert!(!summary.partial);

    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].campaign_id, "cmp-b");
    assert_eq!(summary.alerts[0].alert_type, AlertType::RoasDrop);
}

#[tokio::test]
async fn critical_pass_leaves_roas_alone() {
    let p = pipeline(Arc::new(JsonWorkspace::from_data(workspace(&[(
        "cmp-a",
        Some(1.8),
    )]))));
    let summary = p.service.run_critical_pass().await.expect("critical");
    assert_eq!(summary.campaigns_analyzed, 1);
    assert_eq!(summary.alerts_generated, 0);
    assert!(all_alerts(&p.store).await.is_empty());
}
