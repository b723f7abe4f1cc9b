//! Sensitivity client error types.

use thiserror::Error;

pub type SensitivityResult<T> = Result<T, SensitivityError>;

#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error("Sensitivity service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SensitivityError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SensitivityError::ServiceUnavailable(_)
                | SensitivityError::Timeout(_)
                | SensitivityError::Network(_)
        )
    }
}
