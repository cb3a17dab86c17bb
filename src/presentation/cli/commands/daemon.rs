use std::time::Duration;

use crate::application::services::analysis::AnalysisService;

/// How often the daemon runs each pass.
#[derive(Debug, Clone, Copy)]
pub struct DaemonSchedule {
    pub batch_interval: Duration,
    pub critical_interval: Duration,
}

/// Run full and critical-only passes on their own intervals.
///
/// The daemon runs until it receives a SIGINT signal (Ctrl+C) via
/// [`tokio::signal::ctrl_c()`], at which point it shuts down gracefully and
/// returns `Ok(())`. After each full pass `cleanup` prunes old closed alerts.
///
/// A failing pass is logged and the daemon keeps going. A pass that overruns
/// its interval skips the missed ticks instead of bursting.
///
/// # Errors
///
/// Currently infallible: cycle and cleanup errors are logged, not returned.
pub async fn run_daemon<F>(
    service: &AnalysisService,
    schedule: DaemonSchedule,
    cleanup: F,
) -> anyhow::Result<()>
where
    F: Fn() -> anyhow::Result<usize>,
{
    tracing::info!(
        batch_secs = schedule.batch_interval.as_secs(),
        critical_secs = schedule.critical_interval.as_secs(),
        "Daemon started"
    );
    let mut batch = tokio::time::interval(schedule.batch_interval);
    batch.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut critical = tokio::time::interval(schedule.critical_interval);
    critical.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // Both intervals fire immediately; the full pass covers the first critical tick.
    critical.reset();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = batch.tick() => {
                match service.run_batch().await {
                    Ok(summary) => tracing::info!(
                        analyzed = summary.campaigns_analyzed,
                        alerts = summary.alerts_generated,
                        errors = summary.errors,
                        "Batch cycle finished"
                    ),
                    Err(e) => tracing::error!("Batch cycle failed: {e}"),
                }
                match cleanup() {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Pruned closed alerts"),
                    Err(e) => tracing::warn!("Alert cleanup failed: {e}"),
                }
            }
            _ = critical.tick() => {
                match service.run_critical_pass().await {
                    Ok(summary) => tracing::info!(
                        analyzed = summary.campaigns_analyzed,
                        alerts = summary.alerts_generated,
                        "Critical cycle finished"
                    ),
                    Err(e) => tracing::error!("Critical cycle failed: {e}"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                println!("\nStopping adsentry...");
                break;
            }
        }
    }
    Ok(())
}
