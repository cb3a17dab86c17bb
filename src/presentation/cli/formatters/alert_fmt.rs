use colored::Colorize;

use crate::domain::entities::alert::Alert;
use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::priority::Priority;

/// Strips ANSI/OSC escape sequences from a string to prevent terminal injection.
#[must_use]
pub fn sanitize_terminal(input: &str) -> String {
    input.chars().filter(|c| *c != '\x1b').collect()
}

#[must_use]
pub fn priority_badge(priority: Priority) -> String {
    let label = format!(" {priority} ");
    match priority {
        Priority::Critical => format!("{}", label.on_red().white().bold()),
        Priority::High => format!("{}", label.on_yellow().black().bold()),
        Priority::Medium => format!("{}", label.on_bright_yellow().black()),
        Priority::Low => format!("{}", label.on_blue().white()),
    }
}

#[must_use]
pub fn status_label(status: AlertStatus) -> String {
    let label = status.to_string();
    match status {
        AlertStatus::Active => format!("{}", label.red()),
        AlertStatus::Acknowledged => format!("{}", label.yellow()),
        AlertStatus::Resolved => format!("{}", label.green()),
        AlertStatus::Dismissed => format!("{}", label.dimmed()),
    }
}

/// Multi-line block for one alert: badge and title, message, then the numbers.
#[must_use]
pub fn format_alert(alert: &Alert) -> String {
    let mut lines = vec![format!(
        "{} {} {}",
        priority_badge(alert.priority),
        alert.priority.emoji(),
        sanitize_terminal(&alert.title).bold()
    )];
    if !alert.message.is_empty() {
        lines.push(format!("  {}", sanitize_terminal(&alert.message).dimmed()));
    }
    let previous = alert
        .previous_value
        .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    lines.push(format!(
        "  {} {}  {} {}  current {:.2}  previous {}  threshold {:.2}",
        "campaign".dimmed(),
        sanitize_terminal(&alert.campaign_id),
        "status".dimmed(),
        status_label(alert.status),
        alert.current_value,
        previous,
        alert.threshold,
    ));
    lines.push(format!("  {} {}", "id".dimmed(), alert.id));
    lines.join("\n")
}

pub fn print_alerts(alerts: &[Alert]) {
    for alert in alerts {
        println!();
        println!("{}", format_alert(alert));
    }
    println!();
}

pub fn print_no_alerts() {
    println!();
    println!("{}", "✅ No anomalies detected".green().bold());
    println!();
}
