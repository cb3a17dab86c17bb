use thiserror::Error;
use uuid::Uuid;

use crate::domain::ports::directory::DirectoryError;
use crate::domain::ports::metrics::ProviderError;
use crate::domain::ports::notifier::NotificationError;
use crate::domain::ports::store::StoreError;

/// Errors surfaced by the engine's services.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("metrics provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("campaign directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("persistence error: {0}")]
    Persistence(StoreError),
    #[error("notification channel error: {0}")]
    Channel(#[from] NotificationError),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Persistence(other),
        }
    }
}

const MAX_ID_LEN: usize = 128;

/// Reject empty, oversized or oddly-charactered identifiers before any I/O.
///
/// # Errors
///
/// Returns `EngineError::Validation` describing the offending field.
pub fn validate_id(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(EngineError::Validation(format!(
            "{field} exceeds {MAX_ID_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(EngineError::Validation(format!(
            "{field} contains invalid characters: '{value}'"
        )));
    }
    Ok(())
}

/// # Errors
///
/// Returns `EngineError::Validation` if `value` is not a UUID.
pub fn parse_alert_id(value: &str) -> Result<Uuid, EngineError> {
    Uuid::parse_str(value.trim())
        .map_err(|e| EngineError::Validation(format!("alert id '{value}' is not a UUID: {e}")))
}
