use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// adsentry: ad campaign anomaly detection and alerting
///
/// Watches campaign metrics, raises deduplicated alerts and delivers them
/// over realtime, email and chat channels.
#[derive(Parser, Debug)]
#[command(name = "adsentry")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every detector against one campaign
    #[command(alias = "a")]
    Analyze {
        /// Campaign id
        campaign_id: String,

        /// Also deliver new or refreshed alerts
        #[arg(long)]
        dispatch: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a full analysis over every eligible campaign
    #[command(alias = "b")]
    Batch {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the burn rate and budget loss pass only
    #[command(alias = "c")]
    Critical {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run full and critical passes on their intervals until Ctrl+C
    #[command(alias = "d")]
    Daemon,

    /// Manage a recipient's alerts
    Alerts {
        /// Recipient the operation is scoped to
        #[arg(short, long, global = true, default_value = "")]
        recipient: String,

        #[command(subcommand)]
        action: AlertsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AlertsCommand {
    /// List alerts, unread first
    #[command(alias = "ls")]
    List(ListArgs),

    /// Mark one or more alerts as read
    Read {
        /// Alert ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Mark every unread alert as read
    ReadAll,

    /// Acknowledge an alert
    Ack { id: String },

    /// Resolve an alert
    Resolve { id: String },

    /// Dismiss an alert
    Dismiss { id: String },

    /// Delete a resolved or dismissed alert
    Delete { id: String },

    /// Counts by status, priority and type
    Stats {
        /// Trailing window in days
        #[arg(long, default_value = "30")]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Filter by status (active, acknowledged, resolved, dismissed)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by priority (low, medium, high, critical)
    #[arg(long)]
    pub priority: Option<String>,

    /// Filter by alert type (e.g. roas-drop, burn-rate)
    #[arg(long = "type")]
    pub alert_type: Option<String>,

    /// Filter by campaign id
    #[arg(long)]
    pub campaign: Option<String>,

    /// Only unread alerts
    #[arg(long)]
    pub unread: bool,

    /// Only alerts created in the last N days
    #[arg(long)]
    pub days: Option<u32>,

    #[arg(long, default_value = "1")]
    pub page: usize,

    #[arg(long, default_value = "20")]
    pub per_page: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
