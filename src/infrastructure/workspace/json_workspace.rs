use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::entities::campaign::Campaign;
use crate::domain::entities::snapshot::MetricsSnapshot;
use crate::domain::ports::directory::{CampaignDirectory, DirectoryError};
use crate::domain::ports::metrics::{MetricsProvider, ProviderError};
use crate::domain::value_objects::thresholds::ThresholdOverrides;

/// Metric series recorded for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignSeries {
    pub current: Option<MetricsSnapshot>,
    #[serde(default)]
    pub previous: Option<MetricsSnapshot>,
    /// Most recent first
    #[serde(default)]
    pub weekly: Vec<MetricsSnapshot>,
    #[serde(default)]
    pub month_to_date: Option<MetricsSnapshot>,
}

/// On-disk layout of a workspace file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceData {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    /// Keyed by tenant id
    #[serde(default)]
    pub overrides: HashMap<String, ThresholdOverrides>,
    /// Keyed by campaign id
    #[serde(default)]
    pub metrics: HashMap<String, CampaignSeries>,
}

/// Campaign directory and metrics provider backed by a JSON file.
///
/// The file is re-read at the start of every listing so a long-running
/// daemon picks up new numbers without a restart.
pub struct JsonWorkspace {
    path: Option<PathBuf>,
    data: RwLock<WorkspaceData>,
}

impl JsonWorkspace {
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` if the file cannot be read or parsed.
    pub fn open(path: &str) -> Result<Self, DirectoryError> {
        let expanded = shellexpand::tilde(path);
        let path = PathBuf::from(expanded.as_ref());
        let data = read_file(&path)?;
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    #[must_use]
    pub fn from_data(data: WorkspaceData) -> Self {
        Self {
            path: None,
            data: RwLock::new(data),
        }
    }

    fn refresh(&self) -> Result<(), DirectoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fresh = read_file(path)?;
        *self
            .data
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".into()))? = fresh;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&WorkspaceData) -> T) -> Result<T, String> {
        self.data
            .read()
            .map(|data| f(&data))
            .map_err(|_| "lock poisoned".to_string())
    }

    fn series<T>(
        &self,
        campaign_id: &str,
        f: impl FnOnce(&CampaignSeries) -> T,
    ) -> Result<T, ProviderError> {
        self.read(|data| data.metrics.get(campaign_id).map(f))
            .map_err(|reason| ProviderError::Unavailable {
                campaign_id: campaign_id.to_string(),
                reason,
            })?
            .ok_or_else(|| ProviderError::UnknownCampaign(campaign_id.to_string()))
    }
}

fn read_file(path: &Path) -> Result<WorkspaceData, DirectoryError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DirectoryError::Unavailable(format!("cannot read workspace {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        DirectoryError::Unavailable(format!("invalid workspace {}: {e}", path.display()))
    })
}

#[async_trait]
impl CampaignDirectory for JsonWorkspace {
    async fn list_eligible(&self) -> Result<Vec<Campaign>, DirectoryError> {
        self.refresh()?;
        self.read(|data| {
            data.campaigns
                .iter()
                .filter(|c| c.is_eligible())
                .cloned()
                .collect()
        })
        .map_err(DirectoryError::Unavailable)
    }

    async fn get(&self, campaign_id: &str) -> Result<Option<Campaign>, DirectoryError> {
        self.read(|data| data.campaigns.iter().find(|c| c.id == campaign_id).cloned())
            .map_err(DirectoryError::Unavailable)
    }

    async fn overrides(&self, campaign_id: &str) -> Result<ThresholdOverrides, DirectoryError> {
        self.read(|data| {
            data.campaigns
                .iter()
                .find(|c| c.id == campaign_id)
                .and_then(|c| data.overrides.get(&c.tenant_id))
                .cloned()
                .unwrap_or_default()
        })
        .map_err(DirectoryError::Unavailable)
    }
}

#[async_trait]
impl MetricsProvider for JsonWorkspace {
    async fn get_current(&self, campaign_id: &str) -> Result<MetricsSnapshot, ProviderError> {
        self.series(campaign_id, |s| s.current.clone())?
            .ok_or_else(|| ProviderError::Unavailable {
                campaign_id: campaign_id.to_string(),
                reason: "no current metrics recorded".into(),
            })
    }

    // The file holds a single comparison window, whatever the lookback.
    async fn get_previous(
        &self,
        campaign_id: &str,
        _lookback_days: u32,
    ) -> Result<Option<MetricsSnapshot>, ProviderError> {
        self.series(campaign_id, |s| s.previous.clone())
    }

    async fn get_weekly(
        &self,
        campaign_id: &str,
        weeks: usize,
    ) -> Result<Vec<MetricsSnapshot>, ProviderError> {
        self.series(campaign_id, |s| s.weekly.iter().take(weeks).cloned().collect())
    }

    async fn get_month_to_date(
        &self,
        campaign_id: &str,
        _as_of: NaiveDate,
    ) -> Result<Option<MetricsSnapshot>, ProviderError> {
        self.series(campaign_id, |s| s.month_to_date.clone())
    }
}
