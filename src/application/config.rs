use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::services::analysis::AnalysisSettings;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Everything `adsentry` reads from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub critical_pass: CriticalPassConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Scheduling intervals used by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_batch_interval")]
    pub batch_interval_secs: u64,
    #[serde(default = "default_critical_interval")]
    pub critical_interval_secs: u64,
}

/// Resource bounds of a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_batch_deadline")]
    pub batch_deadline_secs: u64,
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_lookback_days")]
    pub previous_lookback_days: u32,
    #[serde(default = "default_weekly_weeks")]
    pub weekly_weeks: usize,
}

/// Engine-wide detector thresholds; tenants may override any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_roas_drop")]
    pub roas_drop_percent: f64,
    #[serde(default = "default_cpa_above_target")]
    pub cpa_above_target_percent: f64,
    #[serde(default = "default_budget_loss")]
    pub impression_loss_budget_percent: f64,
    #[serde(default = "default_rank_loss")]
    pub impression_loss_rank_percent: f64,
    #[serde(default = "default_ctr_drop_weeks")]
    pub ctr_drop_weeks: usize,
    #[serde(default = "default_ctr_drop_min")]
    pub ctr_drop_min_percent: f64,
    #[serde(default = "default_burn_rate")]
    pub burn_rate_threshold: f64,
}

/// Thresholds the critical-only pass tightens to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPassConfig {
    #[serde(default = "default_critical_burn_rate")]
    pub burn_rate_threshold: f64,
    #[serde(default = "default_critical_budget_loss")]
    pub impression_loss_budget_percent: f64,
}

/// Delivery channels. A channel without an endpoint is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_channel_timeout")]
    pub channel_timeout_secs: u64,
    #[serde(default)]
    pub realtime_url: Option<String>,
    #[serde(default)]
    pub chat_url: Option<String>,
    /// JSON-lines copy of every realtime event (tilde-expanded)
    #[serde(default)]
    pub event_log: Option<String>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    /// Appended to the recipient id when it is not already an address
    #[serde(default)]
    pub recipient_domain: Option<String>,
}

/// Alert database location and retention of closed alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// JSON file standing in for the campaign directory and metrics platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_path")]
    pub path: String,
}

// --- Defaults ---

const fn default_batch_interval() -> u64 {
    3600
}

const fn default_critical_interval() -> u64 {
    900
}

const fn default_max_concurrency() -> usize {
    4
}

const fn default_batch_deadline() -> u64 {
    600
}

const fn default_call_timeout() -> u64 {
    15
}

const fn default_lookback_days() -> u32 {
    7
}

const fn default_weekly_weeks() -> usize {
    6
}

const fn default_roas_drop() -> f64 {
    20.0
}

const fn default_cpa_above_target() -> f64 {
    20.0
}

const fn default_budget_loss() -> f64 {
    40.0
}

const fn default_rank_loss() -> f64 {
    50.0
}

const fn default_ctr_drop_weeks() -> usize {
    3
}

const fn default_ctr_drop_min() -> f64 {
    10.0
}

const fn default_burn_rate() -> f64 {
    1.3
}

const fn default_critical_burn_rate() -> f64 {
    1.5
}

const fn default_critical_budget_loss() -> f64 {
    60.0
}

const fn default_channel_timeout() -> u64 {
    5
}

const fn default_smtp_port() -> u16 {
    587
}

// NOTE: Stored as raw string with tilde, expanded with shellexpand at point of use.
fn default_database_path() -> String {
    "~/.local/share/adsentry/adsentry.db".into()
}

const fn default_retention_days() -> u32 {
    90
}

fn default_workspace_path() -> String {
    "~/.local/share/adsentry/workspace.json".into()
}

// --- Default impls ---

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            batch_interval_secs: default_batch_interval(),
            critical_interval_secs: default_critical_interval(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            batch_deadline_secs: default_batch_deadline(),
            call_timeout_secs: default_call_timeout(),
            previous_lookback_days: default_lookback_days(),
            weekly_weeks: default_weekly_weeks(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            roas_drop_percent: default_roas_drop(),
            cpa_above_target_percent: default_cpa_above_target(),
            impression_loss_budget_percent: default_budget_loss(),
            impression_loss_rank_percent: default_rank_loss(),
            ctr_drop_weeks: default_ctr_drop_weeks(),
            ctr_drop_min_percent: default_ctr_drop_min(),
            burn_rate_threshold: default_burn_rate(),
        }
    }
}

impl Default for CriticalPassConfig {
    fn default() -> Self {
        Self {
            burn_rate_threshold: default_critical_burn_rate(),
            impression_loss_budget_percent: default_critical_budget_loss(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_timeout_secs: default_channel_timeout(),
            realtime_url: None,
            chat_url: None,
            event_log: None,
            email: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: default_workspace_path(),
        }
    }
}

// --- Loading ---

impl AppConfig {
    /// Reads `~/.config/adsentry/config.toml`, writing the defaults there first
    /// when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails when no config directory is known or the file is unreadable or malformed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// # Errors
    ///
    /// Fails when the file is unreadable or malformed, or the defaults cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// # Errors
    ///
    /// Fails when the file is missing, unreadable or not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Writes the config as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("adsentry").join("config.toml"))
    }

    /// Run settings for the analysis service.
    #[must_use]
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            thresholds: ThresholdSet::from(&self.thresholds),
            critical_burn_rate: self.critical_pass.burn_rate_threshold.max(0.01),
            critical_budget_loss_percent: self
                .critical_pass
                .impression_loss_budget_percent
                .clamp(0.0, 100.0),
            max_concurrency: self.analysis.max_concurrency.max(1),
            batch_deadline: Duration::from_secs(self.analysis.batch_deadline_secs.max(1)),
            call_timeout: Duration::from_secs(self.analysis.call_timeout_secs.max(1)),
            previous_lookback_days: self.analysis.previous_lookback_days.max(1),
            weekly_weeks: self.analysis.weekly_weeks.max(2),
        }
    }

    #[must_use]
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.notifications.channel_timeout_secs.max(1))
    }
}

impl From<&ThresholdConfig> for ThresholdSet {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            roas_drop_percent: config.roas_drop_percent,
            cpa_above_target_percent: config.cpa_above_target_percent,
            impression_loss_budget_percent: config.impression_loss_budget_percent,
            impression_loss_rank_percent: config.impression_loss_rank_percent,
            ctr_drop_weeks: config.ctr_drop_weeks,
            ctr_drop_min_percent: config.ctr_drop_min_percent,
            burn_rate_threshold: config.burn_rate_threshold,
            target_cpa: None,
        }
        .sanitized()
    }
}
