use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::entities::snapshot::MetricsSnapshot;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("metrics unavailable for campaign {campaign_id}: {reason}")]
    Unavailable { campaign_id: String, reason: String },
    #[error("unknown campaign: {0}")]
    UnknownCampaign(String),
    #[error("metrics request timed out")]
    Timeout,
}

/// Source of campaign performance metrics (the ads platform side).
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Metrics for the most recent reporting window.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the campaign is unknown or the
    /// platform cannot be reached.
    async fn get_current(&self, campaign_id: &str) -> Result<MetricsSnapshot, ProviderError>;

    /// Metrics for the same-length window `lookback_days` earlier, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the platform cannot be reached.
    async fn get_previous(
        &self,
        campaign_id: &str,
        lookback_days: u32,
    ) -> Result<Option<MetricsSnapshot>, ProviderError>;

    /// Up to `weeks` weekly snapshots, most recent first. Shorter series
    /// and gaps are valid.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the platform cannot be reached.
    async fn get_weekly(
        &self,
        campaign_id: &str,
        weeks: usize,
    ) -> Result<Vec<MetricsSnapshot>, ProviderError>;

    /// Totals from the first of `as_of`'s month up to `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the platform cannot be reached.
    async fn get_month_to_date(
        &self,
        campaign_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<MetricsSnapshot>, ProviderError>;
}
