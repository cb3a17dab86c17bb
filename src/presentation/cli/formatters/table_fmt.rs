use colored::Colorize;

use crate::domain::entities::alert::Alert;
use crate::domain::ports::store::AlertPage;
use crate::domain::value_objects::priority::Priority;

use super::alert_fmt::sanitize_terminal;

/// Formats one page of alerts as an aligned table, followed by a page footer.
#[must_use]
pub fn format_alert_table(page: &AlertPage, page_number: usize, per_page: usize) -> String {
    let header = format!(
        "{:<2} {:<36} {:<9} {:<24} {:<13} {:<16} {:<16}",
        "", "ID", "PRIORITY", "TYPE", "STATUS", "CAMPAIGN", "CREATED"
    );
    let separator = "─".repeat(header.chars().count());
    let mut rows = vec![header, separator];

    for alert in &page.alerts {
        rows.push(format_row(alert));
    }

    let pages = if per_page == 0 {
        1
    } else {
        page.total.div_ceil(per_page).max(1)
    };
    rows.push(format!(
        "{} alert(s), page {page_number}/{pages}",
        page.total
    ));
    rows.join("\n")
}

fn format_row(alert: &Alert) -> String {
    let marker = if alert.is_read { " " } else { "●" };
    let campaign: String = sanitize_terminal(&alert.campaign_id)
        .chars()
        .take(15)
        .collect();
    let row = format!(
        "{:<2} {:<36} {:<9} {:<24} {:<13} {:<16} {:<16}",
        marker,
        alert.id,
        alert.priority,
        alert.alert_type,
        alert.status,
        campaign,
        alert.created_at.format("%Y-%m-%d %H:%M"),
    );
    match alert.priority {
        Priority::Critical => row.red().bold().to_string(),
        Priority::High if !alert.is_read => row.yellow().to_string(),
        _ if alert.is_read => row.dimmed().to_string(),
        _ => row,
    }
}
