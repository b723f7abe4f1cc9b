//! Sensitivity service request/response types.

use serde::{Deserialize, Serialize};

/// Request to analyze a stored video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Presigned URL the service fetches the video from.
    pub media_url: String,
}

/// Safety verdict returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityVerdict {
    /// Whether the video is considered safe to show.
    pub is_safe: bool,
    /// Confidence, percent 0-100.
    pub confidence: u32,
    /// Content labels backing the verdict.
    #[serde(default)]
    pub labels: Vec<String>,
}

