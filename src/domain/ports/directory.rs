use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::campaign::Campaign;
use crate::domain::value_objects::thresholds::ThresholdOverrides;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("campaign directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of campaigns and their tenant-level threshold overrides.
#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    /// Campaigns that are active and belong to an active tenant.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` if the directory cannot be read.
    async fn list_eligible(&self) -> Result<Vec<Campaign>, DirectoryError>;

    /// Look up a single campaign regardless of eligibility.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` if the directory cannot be read.
    async fn get(&self, campaign_id: &str) -> Result<Option<Campaign>, DirectoryError>;

    /// Threshold overrides configured for the campaign's tenant.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` if the directory cannot be read.
    async fn overrides(&self, campaign_id: &str) -> Result<ThresholdOverrides, DirectoryError> {
        let _ = campaign_id;
        Ok(ThresholdOverrides::default())
    }
}
