//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::access::{GroupAccess, OrganizationAccess};
use crate::group::GroupId;
use crate::user::UserId;

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video lifecycle status.
///
/// Every upload starts at `Processing`; the sensitivity workflow moves it to
/// exactly one of the terminal states and nothing moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Sensitivity check not finished yet
    #[default]
    Processing,
    /// Cleared by the sensitivity check (terminal)
    Safe,
    /// Flagged by the sensitivity check (terminal)
    Flagged,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Safe => "safe",
            VideoStatus::Flagged => "flagged",
        }
    }

    /// Parse from the stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(VideoStatus::Processing),
            "safe" => Some(VideoStatus::Safe),
            "flagged" => Some(VideoStatus::Flagged),
            _ => None,
        }
    }

    /// Whether this status has no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        match self {
            VideoStatus::Processing => false,
            VideoStatus::Safe | VideoStatus::Flagged => true,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Video metadata record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    /// Unique video ID
    pub id: VideoId,

    /// Object-storage key of the uploaded file
    pub file_key: String,

    /// Declared media type of the upload (e.g. `video/mp4`)
    pub content_type: String,

    /// Video name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Tag set
    #[serde(default)]
    pub tags: Vec<String>,

    /// Owner (uploader). Ownership always resolves to admin and is the only
    /// thing that authorizes deletion.
    pub owner: UserId,

    /// Lifecycle status
    #[serde(default)]
    pub status: VideoStatus,

    /// Organization-wide access grant
    #[serde(default)]
    pub organization_access: OrganizationAccess,

    /// Per-group access grants, in priority order. A group appears at most
    /// once.
    #[serde(default)]
    pub group_access: Vec<GroupAccess>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video record. Status always starts at `Processing`;
    /// duplicate group grants are dropped, first occurrence wins.
    pub fn new(
        owner: UserId,
        file_key: impl Into<String>,
        content_type: impl Into<String>,
        name: impl Into<String>,
        organization_access: OrganizationAccess,
        group_access: Vec<GroupAccess>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            file_key: file_key.into(),
            content_type: content_type.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            owner,
            status: VideoStatus::Processing,
            organization_access,
            group_access: GroupAccess::dedup(group_access),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// The group ids referenced by the access list, in stored order. Used
    /// as the denormalized membership-query index.
    pub fn access_group_ids(&self) -> Vec<GroupId> {
        self.group_access.iter().map(|ga| ga.group.clone()).collect()
    }

    /// Apply a presence-aware patch. Only provided fields overwrite; an
    /// explicitly empty description is applied, absent fields are kept.
    pub fn apply_patch(&mut self, patch: &VideoPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Presence-aware metadata update. Only name/description/tags are mutable
/// this way; `None` means "not provided", `Some("")` is an explicit clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VideoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.tags.is_none()
    }

    /// Field names carried by this patch, for masked document updates.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.name.is_some() {
            paths.push("name");
        }
        if self.description.is_some() {
            paths.push("description");
        }
        if self.tags.is_some() {
            paths.push("tags");
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    fn sample_video() -> Video {
        Video::new(
            UserId::from("owner-1"),
            "videos/owner-1/v1/clip.mp4",
            "video/mp4",
            "Launch demo",
            OrganizationAccess::default(),
            vec![],
        )
    }

    #[test]
    fn test_upload_starts_processing() {
        let video = sample_video();
        assert_eq!(video.status, VideoStatus::Processing);
        assert!(!video.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(VideoStatus::Safe.is_terminal());
        assert!(VideoStatus::Flagged.is_terminal());
    }

    #[test]
    fn test_duplicate_group_grants_first_wins() {
        let g = GroupId::from("g1");
        let video = Video::new(
            UserId::from("owner-1"),
            "k",
            "video/mp4",
            "n",
            OrganizationAccess::default(),
            vec![
                GroupAccess::new(g.clone(), Role::Editor),
                GroupAccess::new(g.clone(), Role::Admin),
            ],
        );
        assert_eq!(video.group_access.len(), 1);
        assert_eq!(video.group_access[0].role, Role::Editor);
    }

    #[test]
    fn test_patch_absent_fields_kept() {
        let mut video = sample_video().with_description("original");
        video.apply_patch(&VideoPatch {
            name: Some("renamed".into()),
            description: None,
            tags: None,
        });
        assert_eq!(video.name, "renamed");
        assert_eq!(video.description, "original");
    }

    #[test]
    fn test_patch_explicit_empty_description_applied() {
        // Some("") must clear the description; None must not.
        let mut video = sample_video().with_description("original");
        video.apply_patch(&VideoPatch {
            name: None,
            description: Some(String::new()),
            tags: None,
        });
        assert_eq!(video.description, "");
    }

    #[test]
    fn test_patch_field_paths_track_presence() {
        let patch = VideoPatch {
            name: None,
            description: Some(String::new()),
            tags: Some(vec!["demo".into()]),
        };
        assert_eq!(patch.field_paths(), vec!["description", "tags"]);
    }
}
