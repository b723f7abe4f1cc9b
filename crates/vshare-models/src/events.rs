//! Notification events pushed to clients.
//!
//! Payload field names are camelCase to match what the web client consumes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::{VideoId, VideoStatus};

/// Event pushed to an identity's notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// Upload accepted; sensitivity check pending.
    #[serde(rename = "upload:complete")]
    UploadComplete {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        status: VideoStatus,
    },

    /// The sensitivity check for a video has started.
    #[serde(rename = "sensitivity:checking")]
    SensitivityChecking {
        #[serde(rename = "videoId")]
        video_id: VideoId,
    },

    /// The sensitivity check finished and the status is durably persisted.
    #[serde(rename = "sensitivity:result")]
    SensitivityResult {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        status: VideoStatus,
        /// Classifier confidence, percent 0-100. Absent on fail-open.
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<u32>,
        /// Classifier labels, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
        /// Present when the classifier failed and the status fell open.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl NotificationEvent {
    /// Upload accepted notification.
    pub fn upload_complete(video_id: VideoId) -> Self {
        NotificationEvent::UploadComplete {
            video_id,
            status: VideoStatus::Processing,
        }
    }

    /// Check-started notification.
    pub fn checking(video_id: VideoId) -> Self {
        NotificationEvent::SensitivityChecking { video_id }
    }

    /// Successful classification result.
    pub fn result(video_id: VideoId, status: VideoStatus, confidence: u32, labels: Vec<String>) -> Self {
        NotificationEvent::SensitivityResult {
            video_id,
            status,
            confidence: Some(confidence),
            labels,
            error: None,
        }
    }

    /// Fail-open result: the classifier failed, the video was persisted as
    /// safe, and the error is surfaced as an annotation.
    pub fn result_failed_open(video_id: VideoId, error: impl Into<String>) -> Self {
        NotificationEvent::SensitivityResult {
            video_id,
            status: VideoStatus::Safe,
            confidence: None,
            labels: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_shape() {
        let event = NotificationEvent::result(
            VideoId::from("v1"),
            VideoStatus::Safe,
            92,
            vec!["No explicit content detected".into()],
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sensitivity:result");
        assert_eq!(json["videoId"], "v1");
        assert_eq!(json["status"], "safe");
        assert_eq!(json["confidence"], 92);
    }

    #[test]
    fn test_fail_open_result_reports_safe_with_error() {
        let event = NotificationEvent::result_failed_open(VideoId::from("v1"), "timed out");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "safe");
        assert_eq!(json["error"], "timed out");
        assert!(json.get("confidence").is_none());
    }

    #[test]
    fn test_checking_wire_shape() {
        let json = serde_json::to_value(NotificationEvent::checking(VideoId::from("v9"))).unwrap();
        assert_eq!(json["type"], "sensitivity:checking");
        assert_eq!(json["videoId"], "v9");
    }
}
