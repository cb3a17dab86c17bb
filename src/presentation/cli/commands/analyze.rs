use crate::application::services::analysis::AnalysisService;
use crate::presentation::cli::formatters::alert_fmt;
use crate::presentation::cli::formatters::summary_fmt::print_section_header;

/// Analyze one campaign and print what was found.
///
/// With `dispatch`, new and refreshed alerts are also delivered; repeats of
/// an already delivered alert are not.
///
/// # Errors
///
/// Returns an error if the campaign cannot be analyzed or JSON serialization fails.
pub async fn run_analyze(
    service: &AnalysisService,
    campaign_id: &str,
    dispatch: bool,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = service
        .analyze_campaign_outcome(campaign_id)
        .await
        .map_err(|e| anyhow::anyhow!("analysis of {campaign_id} failed: {e}"))?;

    let alerts = if dispatch {
        let mut delivered = service.dispatch_outcome(&outcome).await;
        let delivered_ids: Vec<_> = delivered.iter().map(|a| a.id).collect();
        delivered.extend(
            outcome
                .alerts()
                .into_iter()
                .filter(|a| !delivered_ids.contains(&a.id)),
        );
        delivered
    } else {
        outcome.alerts()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    print_section_header(&format!("🔍 Campaign {campaign_id}"));
    if alerts.is_empty() {
        alert_fmt::print_no_alerts();
    } else {
        println!("{} alert(s):", alerts.len());
        alert_fmt::print_alerts(&alerts);
    }
    Ok(())
}
