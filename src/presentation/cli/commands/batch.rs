use serde::Serialize;

use crate::application::services::analysis::{
    AnalysisPass, AnalysisService, BatchSummary, CampaignFailure,
};
use crate::domain::entities::alert::Alert;
use crate::presentation::cli::formatters::summary_fmt::{format_summary, print_section_header};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryOutput<'a> {
    pass: &'static str,
    campaigns_analyzed: usize,
    alerts_generated: usize,
    alerts_unchanged: usize,
    errors: usize,
    duration_ms: u64,
    skipped: usize,
    partial: bool,
    failures: &'a [CampaignFailure],
    alerts: &'a [Alert],
}

impl<'a> SummaryOutput<'a> {
    fn new(pass: AnalysisPass, summary: &'a BatchSummary) -> Self {
        Self {
            pass: pass.label(),
            campaigns_analyzed: summary.campaigns_analyzed,
            alerts_generated: summary.alerts_generated,
            alerts_unchanged: summary.alerts_unchanged,
            errors: summary.errors,
            duration_ms: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            skipped: summary.skipped,
            partial: summary.partial,
            failures: &summary.failures,
            alerts: &summary.alerts,
        }
    }
}

/// Run a full or critical-only pass and print its summary.
///
/// # Errors
///
/// Returns an error if the pass cannot start or JSON serialization fails.
pub async fn run_pass(service: &AnalysisService, pass: AnalysisPass, json: bool) -> anyhow::Result<()> {
    let summary = match pass {
        AnalysisPass::Full => service.run_batch().await,
        AnalysisPass::CriticalOnly => service.run_critical_pass().await,
    }
    .map_err(|e| anyhow::anyhow!("{} pass aborted: {e}", pass.label()))?;

    if json {
        let output = SummaryOutput::new(pass, &summary);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let title = match pass {
        AnalysisPass::Full => "📊 Batch analysis",
        AnalysisPass::CriticalOnly => "🚨 Critical pass",
    };
    print_section_header(title);
    println!("{}", format_summary(&summary));
    Ok(())
}
