use chrono::{Duration, Utc};
use colored::Colorize;
use serde_json::json;

use crate::application::services::lifecycle::AlertLifecycle;
use crate::domain::entities::alert::Alert;
use crate::domain::ports::store::{AlertFilter, Pagination};
use crate::presentation::cli::app::{AlertsCommand, ListArgs};
use crate::presentation::cli::formatters::alert_fmt;
use crate::presentation::cli::formatters::summary_fmt::{format_stats, print_section_header};
use crate::presentation::cli::formatters::table_fmt::format_alert_table;

/// Translate list flags into a store filter.
///
/// # Errors
///
/// Returns an error if a status, priority or type value is not recognized.
pub fn build_filter(args: &ListArgs) -> anyhow::Result<AlertFilter> {
    Ok(AlertFilter {
        status: args
            .status
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        priority: args
            .priority
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        alert_type: args
            .alert_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        campaign_id: args.campaign.clone(),
        is_read: args.unread.then_some(false),
        created_from: args
            .days
            .map(|days| Utc::now() - Duration::days(i64::from(days))),
        ..AlertFilter::default()
    })
}

/// Run one alert lifecycle operation on behalf of `recipient_id`.
///
/// # Errors
///
/// Returns an error if the operation is rejected (unknown alert, wrong
/// recipient, illegal transition) or the store fails.
pub async fn run_alerts(
    lifecycle: &AlertLifecycle,
    recipient_id: &str,
    action: AlertsCommand,
) -> anyhow::Result<()> {
    match action {
        AlertsCommand::List(args) => {
            let filter = build_filter(&args)?;
            let pagination = Pagination {
                page: args.page,
                per_page: args.per_page,
            };
            let page = lifecycle.list(recipient_id, filter, pagination).await?;
            if args.json {
                let output = json!({
                    "alerts": page.alerts,
                    "total": page.total,
                    "page": args.page,
                    "perPage": args.per_page,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_section_header(&format!("🔔 Alerts for {recipient_id}"));
                println!("{}", format_alert_table(&page, args.page, args.per_page));
            }
        }
        AlertsCommand::Read { ids } => {
            let updated = lifecycle.mark_multiple_as_read(recipient_id, &ids).await?;
            println!("{} {} alert(s) marked as read", "✓".green(), updated.len());
        }
        AlertsCommand::ReadAll => {
            let updated = lifecycle.mark_all_as_read(recipient_id).await?;
            println!("{} {updated} alert(s) marked as read", "✓".green());
        }
        AlertsCommand::Ack { id } => {
            report_transition(&lifecycle.acknowledge(recipient_id, &id).await?);
        }
        AlertsCommand::Resolve { id } => {
            report_transition(&lifecycle.resolve(recipient_id, &id).await?);
        }
        AlertsCommand::Dismiss { id } => {
            report_transition(&lifecycle.dismiss(recipient_id, &id).await?);
        }
        AlertsCommand::Delete { id } => {
            lifecycle.delete(recipient_id, &id).await?;
            println!("{} alert {id} deleted", "✓".green());
        }
        AlertsCommand::Stats { days, json } => {
            let stats = lifecycle.stats(recipient_id, days).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_section_header(&format!("📈 Alert stats for {recipient_id}"));
                println!("{}", format_stats(&stats));
            }
        }
    }
    Ok(())
}

fn report_transition(alert: &Alert) {
    println!(
        "{} alert {} is now {}",
        "✓".green(),
        alert.id,
        alert_fmt::status_label(alert.status)
    );
}
