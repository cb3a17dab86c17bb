use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::application::error::{validate_id, EngineError};
use crate::application::services::dedup::{Deduplicator, UpsertOutcome};
use crate::application::services::dispatcher::Dispatcher;
use crate::domain::detectors::{DetectionInput, DetectorSet};
use crate::domain::entities::alert::Alert;
use crate::domain::entities::campaign::Campaign;
use crate::domain::entities::snapshot::CampaignMetrics;
use crate::domain::ports::directory::CampaignDirectory;
use crate::domain::ports::metrics::{MetricsProvider, ProviderError};
use crate::domain::ports::store::AlertStore;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Knobs for a run, resolved from `AppConfig`.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub thresholds: ThresholdSet,
    pub critical_burn_rate: f64,
    pub critical_budget_loss_percent: f64,
    pub max_concurrency: usize,
    pub batch_deadline: Duration,
    pub call_timeout: Duration,
    pub previous_lookback_days: u32,
    pub weekly_weeks: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSet::default(),
            critical_burn_rate: 1.5,
            critical_budget_loss_percent: 60.0,
            max_concurrency: 4,
            batch_deadline: Duration::from_secs(600),
            call_timeout: Duration::from_secs(15),
            previous_lookback_days: 7,
            weekly_weeks: 6,
        }
    }
}

/// Which detectors a run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPass {
    Full,
    /// Burn rate and budget loss only, with tightened thresholds.
    CriticalOnly,
}

impl AnalysisPass {
    #[must_use]
    pub const fn detectors(self) -> DetectorSet {
        match self {
            Self::Full => DetectorSet::full(),
            Self::CriticalOnly => DetectorSet::critical_only(),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::CriticalOnly => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignFailure {
    pub campaign_id: String,
    pub error: String,
}

/// Outcome of a batch or critical-only run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Campaigns that were started, whether they succeeded or failed
    pub campaigns_analyzed: usize,
    /// Alerts created or refreshed (and therefore dispatched)
    pub alerts_generated: usize,
    /// Detections absorbed by an existing alert without change
    pub alerts_unchanged: usize,
    /// Campaign failures plus individual alerts that could not be stored
    pub errors: usize,
    pub duration: Duration,
    /// Campaigns never started because the deadline passed
    pub skipped: usize,
    pub partial: bool,
    pub failures: Vec<CampaignFailure>,
    /// Alerts created or refreshed, as returned by the dispatcher
    pub alerts: Vec<Alert>,
}

/// Result of evaluating one campaign.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignOutcome {
    pub outcomes: Vec<UpsertOutcome>,
    /// Candidates lost to store failures
    pub dropped: usize,
}

impl CampaignOutcome {
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.outcomes.iter().map(|o| o.alert().clone()).collect()
    }
}

enum CampaignRun {
    Done {
        outcome: CampaignOutcome,
        dispatched: Vec<Alert>,
    },
    Failed(CampaignFailure),
    Skipped,
}

/// Runs detectors over campaigns and feeds their candidates through
/// deduplication and dispatch.
#[derive(Clone)]
pub struct AnalysisService {
    directory: Arc<dyn CampaignDirectory>,
    metrics: Arc<dyn MetricsProvider>,
    store: Arc<dyn AlertStore>,
    dedup: Arc<Deduplicator>,
    dispatcher: Arc<Dispatcher>,
    settings: Arc<AnalysisSettings>,
}

impl AnalysisService {
    #[must_use]
    pub fn new(
        directory: Arc<dyn CampaignDirectory>,
        metrics: Arc<dyn MetricsProvider>,
        store: Arc<dyn AlertStore>,
        dispatcher: Arc<Dispatcher>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            directory,
            metrics,
            dedup: Arc::new(Deduplicator::new(Arc::clone(&store))),
            store,
            dispatcher,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Run all six detectors against one campaign and upsert what they find.
    /// Nothing is dispatched; the caller decides.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed id, `NotFound` for an unknown campaign,
    /// `Precondition` for an ineligible one, otherwise the provider or store error.
    pub async fn analyze_campaign(&self, campaign_id: &str) -> Result<Vec<Alert>, EngineError> {
        Ok(self.analyze_campaign_outcome(campaign_id).await?.alerts())
    }

    /// Same as [`Self::analyze_campaign`], keeping the upsert outcome of every
    /// alert so the caller can tell new detections from repeats.
    ///
    /// # Errors
    ///
    /// Same as [`Self::analyze_campaign`].
    pub async fn analyze_campaign_outcome(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignOutcome, EngineError> {
        validate_id("campaign id", campaign_id)?;
        let deadline = Instant::now() + self.settings.batch_deadline;
        let campaign = self
            .bounded(deadline, self.directory.get(campaign_id))
            .await
            .map_err(|e| match e {
                Bounded::Elapsed => EngineError::Provider(ProviderError::Timeout),
                Bounded::Inner(e) => EngineError::Directory(e),
            })?
            .ok_or_else(|| EngineError::NotFound(format!("campaign {campaign_id}")))?;

        if !campaign.is_eligible() {
            return Err(EngineError::Precondition(format!(
                "campaign {campaign_id} is not active or its tenant is disabled"
            )));
        }

        self.evaluate(&campaign, AnalysisPass::Full, Utc::now().date_naive(), deadline)
            .await
    }

    /// Deliver the created and refreshed alerts of an outcome; unchanged ones
    /// were delivered when first stored. Returns the alerts as persisted after
    /// delivery.
    pub async fn dispatch_outcome(&self, outcome: &CampaignOutcome) -> Vec<Alert> {
        let mut dispatched = Vec::new();
        for upserted in outcome.outcomes.iter().filter(|o| o.needs_dispatch()) {
            let report = self.dispatcher.dispatch(upserted.alert()).await;
            dispatched.push(report.alert);
        }
        dispatched
    }

    /// Full analysis of every eligible campaign, dispatching new and refreshed alerts.
    ///
    /// # Errors
    ///
    /// `Fatal` if the store or the campaign directory is unreachable at start.
    /// Per-campaign failures are reported in the summary.
    pub async fn run_batch(&self) -> Result<BatchSummary, EngineError> {
        self.run_pass(AnalysisPass::Full).await
    }

    /// Burn rate and budget-loss checks only, with tightened thresholds.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run_batch`].
    pub async fn run_critical_pass(&self) -> Result<BatchSummary, EngineError> {
        self.run_pass(AnalysisPass::CriticalOnly).await
    }

    async fn run_pass(&self, pass: AnalysisPass) -> Result<BatchSummary, EngineError> {
        let started = Instant::now();
        let deadline = started + self.settings.batch_deadline;

        match self.bounded(deadline, self.store.health_check()).await {
            Ok(()) => {}
            Err(Bounded::Elapsed) => {
                return Err(EngineError::Fatal("alert store timed out".to_string()))
            }
            Err(Bounded::Inner(e)) => {
                return Err(EngineError::Fatal(format!("alert store unreachable: {e}")))
            }
        }

        let campaigns = match self.bounded(deadline, self.directory.list_eligible()).await {
            Ok(campaigns) => campaigns,
            Err(Bounded::Elapsed) => {
                return Err(EngineError::Fatal(
                    "campaign directory timed out".to_string(),
                ))
            }
            Err(Bounded::Inner(e)) => {
                return Err(EngineError::Fatal(format!("campaign directory failed: {e}")))
            }
        };
        // The directory filters already; a misbehaving adapter must not widen the run.
        let campaigns: Vec<Campaign> = campaigns.into_iter().filter(Campaign::is_eligible).collect();

        tracing::info!(
            pass = pass.label(),
            campaigns = campaigns.len(),
            concurrency = self.settings.max_concurrency,
            "Starting analysis run"
        );

        let as_of = Utc::now().date_naive();
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        for campaign in campaigns {
            let service = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let campaign_id = campaign.id.clone();
            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return CampaignRun::Skipped;
                };
                if Instant::now() >= deadline {
                    return CampaignRun::Skipped;
                }
                service.run_one(&campaign, pass, as_of, deadline).await
            });
            names.insert(handle.id(), campaign_id);
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            let task_id = match &joined {
                Ok((id, _)) => *id,
                Err(e) => e.id(),
            };
            let campaign_id = names.remove(&task_id).unwrap_or_default();
            match joined {
                Ok((_, CampaignRun::Done { outcome, dispatched })) => {
                    summary.campaigns_analyzed += 1;
                    summary.errors += outcome.dropped;
                    summary.alerts_generated += dispatched.len();
                    summary.alerts_unchanged += outcome
                        .outcomes
                        .iter()
                        .filter(|o| !o.needs_dispatch())
                        .count();
                    summary.alerts.extend(dispatched);
                }
                Ok((_, CampaignRun::Failed(failure))) => {
                    tracing::warn!(%campaign_id, "Campaign analysis failed: {}", failure.error);
                    summary.campaigns_analyzed += 1;
                    summary.errors += 1;
                    summary.failures.push(failure);
                }
                Ok((_, CampaignRun::Skipped)) => {
                    tracing::debug!(%campaign_id, "Deadline passed, campaign skipped");
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(%campaign_id, "Campaign task aborted: {e}");
                    summary.campaigns_analyzed += 1;
                    summary.errors += 1;
                    summary.failures.push(CampaignFailure {
                        campaign_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.partial = summary.skipped > 0;
        summary.duration = started.elapsed();
        summary.failures.sort_by(|a, b| a.campaign_id.cmp(&b.campaign_id));

        tracing::info!(
            pass = pass.label(),
            analyzed = summary.campaigns_analyzed,
            alerts = summary.alerts_generated,
            errors = summary.errors,
            skipped = summary.skipped,
            partial = summary.partial,
            duration_ms = u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            "Analysis run finished"
        );

        Ok(summary)
    }

    async fn run_one(
        &self,
        campaign: &Campaign,
        pass: AnalysisPass,
        as_of: NaiveDate,
        deadline: Instant,
    ) -> CampaignRun {
        match self.evaluate(campaign, pass, as_of, deadline).await {
            Ok(outcome) => {
                let dispatched = self.dispatch_outcome(&outcome).await;
                CampaignRun::Done {
                    outcome,
                    dispatched,
                }
            }
            Err(e) => CampaignRun::Failed(CampaignFailure {
                campaign_id: campaign.id.clone(),
                error: e.to_string(),
            }),
        }
    }

    /// Fetch metrics, run the pass's detectors and upsert every candidate.
    async fn evaluate(
        &self,
        campaign: &Campaign,
        pass: AnalysisPass,
        as_of: NaiveDate,
        deadline: Instant,
    ) -> Result<CampaignOutcome, EngineError> {
        let overrides = self
            .bounded(deadline, self.directory.overrides(&campaign.id))
            .await
            .map_err(|e| match e {
                Bounded::Elapsed => EngineError::Provider(ProviderError::Timeout),
                Bounded::Inner(e) => EngineError::Directory(e),
            })?;
        let mut thresholds = self.settings.thresholds.with_overrides(&overrides);
        if pass == AnalysisPass::CriticalOnly {
            thresholds = thresholds.tightened(
                self.settings.critical_burn_rate,
                self.settings.critical_budget_loss_percent,
            );
        }

        let metrics = self.fetch_metrics(&campaign.id, pass, as_of, deadline).await?;
        let input = DetectionInput {
            campaign,
            metrics: &metrics,
            as_of,
        };
        let candidates = pass.detectors().run(&input, &thresholds);

        let mut outcome = CampaignOutcome::default();
        for candidate in candidates {
            let alert_type = candidate.alert_type;
            let upsert = self
                .dedup
                .upsert(candidate, &campaign.id, &campaign.recipient_id);
            match self.bounded(deadline, upsert).await {
                Ok(upserted) => outcome.outcomes.push(upserted),
                Err(Bounded::Elapsed) => {
                    tracing::warn!(
                        campaign_id = %campaign.id,
                        %alert_type,
                        "Storing alert timed out"
                    );
                    outcome.dropped += 1;
                }
                Err(Bounded::Inner(e)) => {
                    tracing::warn!(
                        campaign_id = %campaign.id,
                        %alert_type,
                        "Could not store alert: {e}"
                    );
                    outcome.dropped += 1;
                }
            }
        }
        Ok(outcome)
    }

    async fn fetch_metrics(
        &self,
        campaign_id: &str,
        pass: AnalysisPass,
        as_of: NaiveDate,
        deadline: Instant,
    ) -> Result<CampaignMetrics, ProviderError> {
        let current = self.bounded(deadline, self.metrics.get_current(campaign_id));
        let month_to_date = self.bounded(
            deadline,
            self.metrics.get_month_to_date(campaign_id, as_of),
        );

        if pass == AnalysisPass::CriticalOnly {
            let (current, month_to_date) = tokio::try_join!(
                flatten(current),
                flatten(month_to_date)
            )?;
            return Ok(CampaignMetrics {
                month_to_date,
                ..CampaignMetrics::current_only(current)
            });
        }

        let previous = self.bounded(
            deadline,
            self.metrics
                .get_previous(campaign_id, self.settings.previous_lookback_days),
        );
        let weekly = self.bounded(
            deadline,
            self.metrics.get_weekly(campaign_id, self.settings.weekly_weeks),
        );
        let (current, previous, weekly, month_to_date) = tokio::try_join!(
            flatten(current),
            flatten(previous),
            flatten(weekly),
            flatten(month_to_date)
        )?;
        Ok(CampaignMetrics {
            current,
            previous,
            weekly,
            month_to_date,
        })
    }

    /// Bound an external call by the per-call timeout and the run's deadline,
    /// whichever comes first.
    async fn bounded<T, E>(
        &self,
        deadline: Instant,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, Bounded<E>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let limit = self.settings.call_timeout.min(remaining);
        match tokio::time::timeout(limit, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Bounded::Inner(e)),
            Err(_) => Err(Bounded::Elapsed),
        }
    }
}

enum Bounded<E> {
    Elapsed,
    Inner(E),
}

async fn flatten<T>(
    fut: impl Future<Output = Result<T, Bounded<ProviderError>>>,
) -> Result<T, ProviderError> {
    fut.await.map_err(|e| match e {
        Bounded::Elapsed => ProviderError::Timeout,
        Bounded::Inner(e) => e,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::campaign::tests::campaign;
    use crate::domain::entities::snapshot::tests::snapshot;
    use crate::domain::entities::snapshot::MetricsSnapshot;
    use crate::domain::ports::directory::DirectoryError;
    use crate::domain::ports::notifier::{
        ChatPoster, EmailSender, NotificationError, RealtimePublisher,
    };
    use crate::domain::ports::store::{AlertFilter, Pagination, StoreError};
    use crate::domain::value_objects::alert_type::AlertType;
    use crate::domain::value_objects::priority::Priority;
    use crate::domain::value_objects::thresholds::ThresholdOverrides;
    use crate::infrastructure::persistence::in_memory_store::tests::SlowStore;
    use crate::infrastructure::persistence::in_memory_store::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Directory {
        campaigns: Vec<Campaign>,
        overrides: HashMap<String, ThresholdOverrides>,
        fail: bool,
    }

    #[async_trait]
    impl CampaignDirectory for Directory {
        async fn list_eligible(&self) -> Result<Vec<Campaign>, DirectoryError> {
            if self.fail {
                return Err(DirectoryError::Unavailable("db down".into()));
            }
            Ok(self
                .campaigns
                .iter()
                .filter(|c| c.is_eligible())
                .cloned()
                .collect())
        }

        async fn get(&self, campaign_id: &str) -> Result<Option<Campaign>, DirectoryError> {
            Ok(self.campaigns.iter().find(|c| c.id == campaign_id).cloned())
        }

        async fn overrides(&self, campaign_id: &str) -> Result<ThresholdOverrides, DirectoryError> {
            Ok(self.overrides.get(campaign_id).cloned().unwrap_or_default())
        }
    }

    /// How many `get_current` calls are in flight, and the most seen at once.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    /// ROAS fell from 3.0 to 1.8 for every campaign except the failing ones.
    struct Metrics {
        failing: Vec<String>,
        panicking: Option<String>,
        delay: Duration,
        in_flight: Arc<InFlight>,
    }

    impl Metrics {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(ToString::to_string).collect(),
                panicking: None,
                delay: Duration::ZERO,
                in_flight: Arc::new(InFlight::default()),
            }
        }
    }

    #[async_trait]
    impl MetricsProvider for Metrics {
        async fn get_current(&self, campaign_id: &str) -> Result<MetricsSnapshot, ProviderError> {
            assert!(
                self.panicking.as_deref() != Some(campaign_id),
                "provider bug for {campaign_id}"
            );
            let now = self.in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.in_flight.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.current.fetch_sub(1, Ordering::SeqCst);
            if self.failing.iter().any(|f| f == campaign_id) {
                return Err(ProviderError::Unavailable {
                    campaign_id: campaign_id.to_string(),
                    reason: "quota exceeded".into(),
                });
            }
            Ok(snapshot(100.0, 10.0, 180.0))
        }

        async fn get_previous(
            &self,
            _campaign_id: &str,
            _lookback_days: u32,
        ) -> Result<Option<MetricsSnapshot>, ProviderError> {
            Ok(Some(snapshot(100.0, 10.0, 300.0)))
        }

        async fn get_weekly(
            &self,
            _campaign_id: &str,
            _weeks: usize,
        ) -> Result<Vec<MetricsSnapshot>, ProviderError> {
            Ok(Vec::new())
        }

        async fn get_month_to_date(
            &self,
            _campaign_id: &str,
            _as_of: NaiveDate,
        ) -> Result<Option<MetricsSnapshot>, ProviderError> {
            Ok(None)
        }
    }

    struct Quiet;

    #[async_trait]
    impl RealtimePublisher for Quiet {
        async fn publish(&self, _: &str, _: &str, _: &Value) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSender for Quiet {
        async fn send_alert_email(&self, _: &Alert) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ChatPoster for Quiet {
        async fn post_system_message(&self, _: &str, _: &Alert) -> Result<String, NotificationError> {
            Ok("conv-1".into())
        }
    }

    struct DownStore;

    #[async_trait]
    impl AlertStore for DownStore {
        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn find_active_since(
            &self,
            _: &str,
            _: AlertType,
            _: chrono::DateTime<Utc>,
        ) -> Result<Option<Alert>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn create_unless_active(
            &self,
            _: &Alert,
            _: chrono::DateTime<Utc>,
        ) -> Result<crate::domain::ports::store::CreateOutcome, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn create(&self, _: &Alert) -> Result<Alert, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn update(
            &self,
            _: uuid::Uuid,
            _: &crate::domain::entities::alert::AlertUpdate,
        ) -> Result<Alert, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get(&self, _: uuid::Uuid) -> Result<Option<Alert>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn list(
            &self,
            _: &AlertFilter,
            _: &Pagination,
        ) -> Result<crate::domain::ports::store::AlertPage, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn update_status(
            &self,
            _: uuid::Uuid,
            _: crate::domain::value_objects::alert_status::AlertStatus,
            _: chrono::DateTime<Utc>,
        ) -> Result<Alert, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn mark_all_read(&self, _: &str, _: chrono::DateTime<Utc>) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn delete(&self, _: uuid::Uuid) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn service(
        store: Arc<dyn AlertStore>,
        directory: Directory,
        metrics: Metrics,
        settings: AnalysisSettings,
    ) -> AnalysisService {
        let quiet = Arc::new(Quiet);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&quiet) as Arc<dyn RealtimePublisher>,
            Arc::clone(&quiet) as Arc<dyn EmailSender>,
            quiet as Arc<dyn ChatPoster>,
            Duration::from_secs(1),
        ));
        AnalysisService::new(
            Arc::new(directory),
            Arc::new(metrics),
            store,
            dispatcher,
            settings,
        )
    }

    fn directory(ids: &[&str]) -> Directory {
        Directory {
            campaigns: ids.iter().map(|id| campaign(id)).collect(),
            overrides: HashMap::new(),
            fail: false,
        }
    }

    #[tokio::test]
    async fn analyze_campaign_returns_roas_alert() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(
            store,
            directory(&["c1"]),
            Metrics::new(&[]),
            AnalysisSettings::default(),
        );
        let alerts = svc.analyze_campaign("c1").await.expect("analyze");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::RoasDrop);
        assert_eq!(alerts[0].priority, Priority::High);
        assert!(!alerts[0].email_sent, "analyze_campaign does not dispatch");
    }

    #[tokio::test]
    async fn analyze_campaign_rejects_bad_and_unknown_ids() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(
            store,
            directory(&["c1"]),
            Metrics::new(&[]),
            AnalysisSettings::default(),
        );
        assert!(matches!(
            svc.analyze_campaign("").await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            svc.analyze_campaign("c9").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn analyze_campaign_rejects_paused_campaign() {
        let store = Arc::new(InMemoryStore::new());
        let mut dir = directory(&["c1"]);
        dir.campaigns[0].status = crate::domain::entities::campaign::CampaignStatus::Paused;
        let svc = service(store, dir, Metrics::new(&[]), AnalysisSettings::default());
        assert!(matches!(
            svc.analyze_campaign("c1").await,
            Err(EngineError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn tenant_override_suppresses_alert() {
        let store = Arc::new(InMemoryStore::new());
        let mut dir = directory(&["c1"]);
        dir.overrides.insert(
            "c1".into(),
            ThresholdOverrides {
                roas_drop_percent: Some(50.0),
                ..ThresholdOverrides::default()
            },
        );
        let svc = service(store, dir, Metrics::new(&[]), AnalysisSettings::default());
        let alerts = svc.analyze_campaign("c1").await.expect("analyze");
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn batch_isolates_failing_campaign() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(
            Arc::clone(&store) as Arc<dyn AlertStore>,
            directory(&["c1", "c2", "c3"]),
            Metrics::new(&["c2"]),
            AnalysisSettings::default(),
        );
        let summary = svc.run_batch().await.expect("batch");
        assert_eq!(summary.campaigns_analyzed, 3);
        assert_eq!(summary.alerts_generated, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].campaign_id, "c2");
        assert!(!summary.partial);
        assert!(summary.alerts.iter().all(|a| a.email_sent && a.chat_sent));
    }

    #[tokio::test]
    async fn second_batch_dispatches_nothing_new() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(
            Arc::clone(&store) as Arc<dyn AlertStore>,
            directory(&["c1", "c2"]),
            Metrics::new(&[]),
            AnalysisSettings::default(),
        );
        svc.run_batch().await.expect("first");
        let summary = svc.run_batch().await.expect("second");
        assert_eq!(summary.alerts_generated, 0);
        assert_eq!(summary.alerts_unchanged, 2);
        let total = store
            .list(&AlertFilter::default(), &Pagination::all())
            .await
            .expect("list")
            .total;
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn ineligible_campaigns_are_not_analyzed() {
        let store = Arc::new(InMemoryStore::new());
        let mut dir = directory(&["c1", "c2"]);
        dir.campaigns[1].tenant_active = false;
        let svc = service(store, dir, Metrics::new(&[]), AnalysisSettings::default());
        let summary = svc.run_batch().await.expect("batch");
        assert_eq!(summary.campaigns_analyzed, 1);
    }

    #[tokio::test]
    async fn critical_pass_ignores_roas() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(
            store,
            directory(&["c1"]),
            Metrics::new(&[]),
            AnalysisSettings::default(),
        );
        let summary = svc.run_critical_pass().await.expect("critical");
        assert_eq!(summary.campaigns_analyzed, 1);
        assert_eq!(summary.alerts_generated, 0);
    }

    #[tokio::test]
    async fn unreachable_store_is_fatal() {
        let svc = service(
            Arc::new(DownStore),
            directory(&["c1"]),
            Metrics::new(&[]),
            AnalysisSettings::default(),
        );
        assert!(matches!(svc.run_batch().await, Err(EngineError::Fatal(_))));
    }

    #[tokio::test]
    async fn unreachable_directory_is_fatal() {
        let store = Arc::new(InMemoryStore::new());
        let mut dir = directory(&["c1"]);
        dir.fail = true;
        let svc = service(store, dir, Metrics::new(&[]), AnalysisSettings::default());
        assert!(matches!(svc.run_batch().await, Err(EngineError::Fatal(_))));
    }

    #[tokio::test]
    async fn deadline_skips_remaining_campaigns() {
        let store = Arc::new(InMemoryStore::new());
        let mut metrics = Metrics::new(&[]);
        metrics.delay = Duration::from_millis(300);
        let settings = AnalysisSettings {
            max_concurrency: 1,
            batch_deadline: Duration::from_millis(100),
            call_timeout: Duration::from_secs(5),
            ..AnalysisSettings::default()
        };
        let svc = service(store, directory(&["c1", "c2", "c3"]), metrics, settings);
        let summary = svc.run_batch().await.expect("batch");
        assert!(summary.partial);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.campaigns_analyzed, 1);
        assert_eq!(summary.errors, 1, "in-flight call is cut at the deadline");
    }

    #[tokio::test]
    async fn concurrency_is_bounded_but_all_run() {
        let store = Arc::new(InMemoryStore::new());
        let ids: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let settings = AnalysisSettings {
            max_concurrency: 2,
            ..AnalysisSettings::default()
        };
        let mut metrics = Metrics::new(&[]);
        metrics.delay = Duration::from_millis(20);
        let in_flight = Arc::clone(&metrics.in_flight);

        let svc = service(store, directory(&refs), metrics, settings);
        let summary = svc.run_batch().await.expect("batch");
        assert_eq!(summary.campaigns_analyzed, 10);
        assert_eq!(summary.alerts_generated, 10);

        let peak = in_flight.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "{peak} campaigns fetched at once");
        assert!(peak > 1, "campaigns never overlapped");
    }

    #[tokio::test]
    async fn slow_store_drops_alert_instead_of_stalling() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(3), Duration::ZERO));
        let settings = AnalysisSettings {
            call_timeout: Duration::from_millis(100),
            batch_deadline: Duration::from_millis(300),
            ..AnalysisSettings::default()
        };
        let svc = service(store, directory(&["c1"]), Metrics::new(&[]), settings);

        let started = std::time::Instant::now();
        let summary = svc.run_batch().await.expect("batch");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(summary.campaigns_analyzed, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.alerts_generated, 0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn panicking_campaign_is_reported_by_id() {
        let store = Arc::new(InMemoryStore::new());
        let mut metrics = Metrics::new(&[]);
        metrics.panicking = Some("c2".to_string());
        let svc = service(
            store,
            directory(&["c1", "c2", "c3"]),
            metrics,
            AnalysisSettings::default(),
        );
        let summary = svc.run_batch().await.expect("batch");
        assert_eq!(summary.campaigns_analyzed, 3);
        assert_eq!(summary.alerts_generated, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].campaign_id, "c2");
        assert!(summary.failures[0].error.contains("panic"));
    }
}
