use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use adsentry::application::config::AppConfig;
use adsentry::application::services::analysis::{AnalysisPass, AnalysisService};
use adsentry::application::services::dispatcher::Dispatcher;
use adsentry::application::services::lifecycle::AlertLifecycle;
use adsentry::domain::ports::directory::CampaignDirectory;
use adsentry::domain::ports::metrics::MetricsProvider;
use adsentry::domain::ports::notifier::{ChatPoster, EmailSender, RealtimePublisher};
use adsentry::domain::ports::store::AlertStore;
use adsentry::infrastructure::notifications::chat::WebhookChatPoster;
use adsentry::infrastructure::notifications::composite::CompositePublisher;
use adsentry::infrastructure::notifications::disabled::DisabledChannel;
use adsentry::infrastructure::notifications::email::SmtpEmailSender;
use adsentry::infrastructure::notifications::log_file::EventLogPublisher;
use adsentry::infrastructure::notifications::webhook::WebhookRealtimePublisher;
use adsentry::infrastructure::persistence::sqlite_store::SqliteStore;
use adsentry::infrastructure::workspace::json_workspace::JsonWorkspace;
use adsentry::presentation::cli::app::{Cli, Commands};
use adsentry::presentation::cli::commands::alerts::run_alerts;
use adsentry::presentation::cli::commands::analyze::run_analyze;
use adsentry::presentation::cli::commands::batch::run_pass;
use adsentry::presentation::cli::commands::daemon::{run_daemon, DaemonSchedule};

fn print_banner() {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  ADSENTRY · Campaign Anomaly Watch".bold().cyan());
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::new(&config.database.path)
        .with_context(|| format!("cannot open alert database {}", config.database.path))?;
    Ok(Arc::new(store))
}

fn realtime_channel(config: &AppConfig) -> anyhow::Result<Arc<dyn RealtimePublisher>> {
    let mut publishers: Vec<Box<dyn RealtimePublisher>> = Vec::new();
    if let Some(ref url) = config.notifications.realtime_url {
        publishers.push(Box::new(
            WebhookRealtimePublisher::new(url.clone(), config.channel_timeout())
                .context("cannot set up realtime gateway")?,
        ));
    }
    if let Some(ref path) = config.notifications.event_log {
        publishers.push(Box::new(EventLogPublisher::new(path)));
    }
    if publishers.is_empty() {
        return Ok(Arc::new(DisabledChannel));
    }
    Ok(Arc::new(CompositePublisher::new(publishers)))
}

fn email_channel(config: &AppConfig) -> anyhow::Result<Arc<dyn EmailSender>> {
    match config.notifications.email {
        Some(ref email) => Ok(Arc::new(
            SmtpEmailSender::new(email, config.channel_timeout())
                .context("cannot set up SMTP email")?,
        )),
        None => Ok(Arc::new(DisabledChannel)),
    }
}

fn chat_channel(config: &AppConfig) -> anyhow::Result<Arc<dyn ChatPoster>> {
    match config.notifications.chat_url {
        Some(ref url) => Ok(Arc::new(
            WebhookChatPoster::new(url.clone(), config.channel_timeout())
                .context("cannot set up chat webhook")?,
        )),
        None => Ok(Arc::new(DisabledChannel)),
    }
}

fn analysis_service(
    config: &AppConfig,
    store: Arc<dyn AlertStore>,
) -> anyhow::Result<AnalysisService> {
    let workspace = Arc::new(
        JsonWorkspace::open(&config.workspace.path)
            .with_context(|| format!("cannot open workspace {}", config.workspace.path))?,
    );
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        realtime_channel(config)?,
        email_channel(config)?,
        chat_channel(config)?,
        config.channel_timeout(),
    ));
    Ok(AnalysisService::new(
        Arc::clone(&workspace) as Arc<dyn CampaignDirectory>,
        workspace as Arc<dyn MetricsProvider>,
        store,
        dispatcher,
        config.analysis_settings(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = if let Some(ref path) = cli.config {
        AppConfig::load_from(path)?
    } else {
        AppConfig::load()?
    };

    // Manual DI: main.rs is the only place that knows concrete types
    let store = open_store(&config)?;
    let alert_store: Arc<dyn AlertStore> = Arc::clone(&store) as Arc<dyn AlertStore>;

    match cli.command {
        Commands::Analyze {
            campaign_id,
            dispatch,
            json,
        } => {
            let service = analysis_service(&config, alert_store)?;
            run_analyze(&service, &campaign_id, dispatch, json).await?;
        }
        Commands::Batch { json } => {
            let service = analysis_service(&config, alert_store)?;
            run_pass(&service, AnalysisPass::Full, json).await?;
        }
        Commands::Critical { json } => {
            let service = analysis_service(&config, alert_store)?;
            run_pass(&service, AnalysisPass::CriticalOnly, json).await?;
        }
        Commands::Daemon => {
            let service = analysis_service(&config, alert_store)?;
            print_banner();
            let schedule = DaemonSchedule {
                batch_interval: Duration::from_secs(config.general.batch_interval_secs.max(1)),
                critical_interval: Duration::from_secs(
                    config.general.critical_interval_secs.max(1),
                ),
            };
            let retention_days = config.database.retention_days;
            run_daemon(&service, schedule, || {
                store
                    .cleanup_resolved(retention_days)
                    .context("cannot prune closed alerts")
            })
            .await?;
        }
        Commands::Alerts { recipient, action } => {
            let lifecycle = AlertLifecycle::new(alert_store);
            run_alerts(&lifecycle, &recipient, action).await?;
        }
    }

    Ok(())
}
