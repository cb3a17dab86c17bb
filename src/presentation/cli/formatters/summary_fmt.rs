use colored::Colorize;

use crate::application::services::analysis::BatchSummary;
use crate::application::services::lifecycle::AlertStats;

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}

/// Human summary of a batch or critical-only run.
#[must_use]
pub fn format_summary(summary: &BatchSummary) -> String {
    let mut lines = vec![
        format!("Campaigns analyzed : {}", summary.campaigns_analyzed),
        format!(
            "Alerts generated   : {}",
            summary.alerts_generated.to_string().bold()
        ),
        format!("Alerts unchanged   : {}", summary.alerts_unchanged),
        format!("Errors             : {}", colorize_count(summary.errors)),
        format!("Duration           : {:.2}s", summary.duration.as_secs_f64()),
    ];
    if summary.partial {
        lines.push(format!(
            "{}",
            format!(
                "⚠ Deadline reached: {} campaign(s) not analyzed",
                summary.skipped
            )
            .yellow()
            .bold()
        ));
    }
    for failure in &summary.failures {
        lines.push(format!(
            "  {} {}: {}",
            "✗".red(),
            failure.campaign_id,
            failure.error.dimmed()
        ));
    }
    lines.join("\n")
}

fn colorize_count(count: usize) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().red().bold().to_string()
    }
}

/// Dashboard counts for one recipient.
#[must_use]
pub fn format_stats(stats: &AlertStats) -> String {
    let mut lines = vec![
        format!("Last {} day(s)", stats.window_days),
        format!("Total  : {}", stats.total),
        format!("Unread : {}", stats.unread.to_string().bold()),
    ];
    push_counts(&mut lines, "By status", &stats.by_status);
    push_counts(&mut lines, "By priority", &stats.by_priority);
    push_counts(&mut lines, "By type", &stats.by_type);
    lines.join("\n")
}

fn push_counts<K: std::fmt::Display>(
    lines: &mut Vec<String>,
    title: &str,
    counts: &std::collections::BTreeMap<K, usize>,
) {
    if counts.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(title.bold().to_string());
    for (key, count) in counts {
        lines.push(format!("  {:<24} {count:>5}", key.to_string()));
    }
}
