//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use vshare_models::{UserId, VideoId};

/// Unique identifier for a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job to run the sensitivity check for a freshly uploaded video.
///
/// Enqueued by the upload handler, consumed by the worker outside the
/// request/response cycle. One upload enqueues at most one of these: the
/// idempotency key is derived from the video id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityScanJob {
    /// Unique job ID
    pub job_id: JobId,
    /// The video to scan
    pub video_id: VideoId,
    /// The owner whose channel receives the status events
    pub owner_id: UserId,
    /// Object-storage key of the uploaded file
    pub file_key: String,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl SensitivityScanJob {
    pub fn new(video_id: VideoId, owner_id: UserId, file_key: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            owner_id,
            file_key: file_key.into(),
            created_at: Utc::now(),
        }
    }

    /// Idempotency key for deduplication: one scan per upload.
    pub fn idempotency_key(&self) -> String {
        format!("scan:{}", self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_is_per_video() {
        let video = VideoId::from("v1");
        let a = SensitivityScanJob::new(video.clone(), UserId::from("u1"), "k1");
        let b = SensitivityScanJob::new(video, UserId::from("u1"), "k1");
        // Distinct jobs for the same upload collapse onto one key.
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_eq!(a.idempotency_key(), "scan:v1");
    }
}
