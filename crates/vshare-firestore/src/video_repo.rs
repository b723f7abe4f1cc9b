//! Video repository.
//!
//! Videos live in one top-level collection and carry a denormalized
//! `access_group_ids` array so shared-library listing can run as a single
//! indexed query.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use vshare_models::{
    GroupAccess, GroupId, OrganizationAccess, PageRequest, Requester, Role, UserId, Video, VideoId,
    VideoPatch, VideoStatus,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Filter, StructuredQuery, ToFirestoreValue, Value};

/// Collection holding video documents.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Firestore caps ARRAY_CONTAINS_ANY disjunctions at 30 values.
const MAX_GROUP_DISJUNCTION: usize = 30;

/// Which slice of the library a listing asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoScope {
    /// Videos the requester owns.
    Mine,
    /// Videos owned by others but shared with the requester.
    Shared,
    /// Everything the requester may see.
    All,
}

impl VideoScope {
    /// Parse the query-string filter value; unknown values mean `All`,
    /// matching the original API.
    pub fn from_filter(s: &str) -> Self {
        match s {
            "mine" => VideoScope::Mine,
            "shared" => VideoScope::Shared,
            _ => VideoScope::All,
        }
    }
}

/// Repository for video documents.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &VideoId) -> FirestoreResult<Option<Video>> {
        let doc = self
            .client
            .get_document(VIDEOS_COLLECTION, video_id.as_str())
            .await?;
        doc.map(|d| video_from_doc(&d)).transpose()
    }

    /// Create a new video record.
    pub async fn create(&self, video: &Video) -> FirestoreResult<()> {
        self.client
            .create_document(VIDEOS_COLLECTION, video.id.as_str(), video_to_fields(video))
            .await?;
        info!(video_id = %video.id, owner = %video.owner, "Created video record");
        Ok(())
    }

    /// Write the lifecycle status. A single masked update, so concurrent
    /// metadata edits cannot lose it.
    pub async fn set_status(&self, video_id: &VideoId, status: VideoStatus) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        self.client
            .update_document(
                VIDEOS_COLLECTION,
                video_id.as_str(),
                fields,
                Some(vec!["status".to_string(), "updated_at".to_string()]),
            )
            .await?;
        info!(video_id = %video_id, status = %status, "Updated video status");
        Ok(())
    }

    /// Apply a presence-aware metadata patch as one masked update. Only the
    /// fields the patch carries are written; everything else keeps its
    /// stored value.
    pub async fn apply_patch(&self, video_id: &VideoId, patch: &VideoPatch) -> FirestoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut fields = HashMap::new();
        let mut mask: Vec<String> = patch.field_paths().iter().map(|s| s.to_string()).collect();

        if let Some(name) = &patch.name {
            fields.insert("name".to_string(), name.to_firestore_value());
        }
        if let Some(description) = &patch.description {
            fields.insert("description".to_string(), description.to_firestore_value());
        }
        if let Some(tags) = &patch.tags {
            fields.insert("tags".to_string(), tags.to_firestore_value());
        }

        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        mask.push("updated_at".to_string());

        self.client
            .update_document(VIDEOS_COLLECTION, video_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Delete a video's metadata record.
    pub async fn delete(&self, video_id: &VideoId) -> FirestoreResult<()> {
        self.client
            .delete_document(VIDEOS_COLLECTION, video_id.as_str())
            .await
    }

    /// List the requester's library slice, newest first, with an offset
    /// page and the total match count.
    pub async fn list(
        &self,
        requester: &Requester,
        scope: VideoScope,
        page: PageRequest,
    ) -> FirestoreResult<(Vec<Video>, u64)> {
        let Some(filter) = self.scope_filter(requester, scope) else {
            // Nothing can match (e.g. `shared` for a user with no groups
            // and no organization); skip the round-trip.
            return Ok((Vec::new(), 0));
        };

        let query = StructuredQuery::collection(VIDEOS_COLLECTION)
            .with_filter(filter.clone())
            .order_by_desc("created_at")
            .with_offset(page.offset())
            .with_limit(page.limit());

        let docs = self.client.run_query(query).await?;
        let videos: Vec<Video> = docs
            .iter()
            .map(video_from_doc)
            .collect::<FirestoreResult<_>>()?;

        let count_query =
            StructuredQuery::collection(VIDEOS_COLLECTION).with_filter(filter);
        let total = self.client.count(count_query).await?;

        Ok((videos, total))
    }

    /// Build the access filter for a scope; `None` means the result set is
    /// provably empty.
    fn scope_filter(&self, requester: &Requester, scope: VideoScope) -> Option<Filter> {
        let owner_eq = Filter::eq("owner", requester.user_id.as_str());
        let shared_branches = self.shared_branches(requester);

        match scope {
            VideoScope::Mine => Some(owner_eq),
            VideoScope::Shared => {
                if shared_branches.is_empty() {
                    return None;
                }
                Some(Filter::and(vec![
                    Filter::neq("owner", requester.user_id.as_str()),
                    Filter::or(shared_branches),
                ]))
            }
            VideoScope::All => {
                let mut branches = vec![owner_eq];
                branches.extend(shared_branches);
                Some(Filter::or(branches))
            }
        }
    }

    /// The ways a non-owner can see a video: a group grant covering one of
    /// the requester's groups, or an enabled organization grant when the
    /// requester belongs to an organization.
    fn shared_branches(&self, requester: &Requester) -> Vec<Filter> {
        let mut branches = Vec::new();

        if !requester.groups.is_empty() {
            let mut group_ids: Vec<&GroupId> = requester.groups.iter().collect();
            group_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            if group_ids.len() > MAX_GROUP_DISJUNCTION {
                warn!(
                    user_id = %requester.user_id,
                    groups = group_ids.len(),
                    "Requester exceeds the group-disjunction cap; overflow groups ignored in listing"
                );
                group_ids.truncate(MAX_GROUP_DISJUNCTION);
            }
            branches.push(Filter::array_contains_any(
                "access_group_ids",
                group_ids
                    .into_iter()
                    .map(|g| g.as_str().to_firestore_value())
                    .collect(),
            ));
        }

        if requester.organization.is_some() {
            branches.push(Filter::eq("organization_access.enabled", true));
        }

        branches
    }
}

// ============================================================================
// Document mapping
// ============================================================================

pub(crate) fn video_to_fields(video: &Video) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), video.id.as_str().to_firestore_value());
    fields.insert("file_key".to_string(), video.file_key.to_firestore_value());
    fields.insert(
        "content_type".to_string(),
        video.content_type.to_firestore_value(),
    );
    fields.insert("name".to_string(), video.name.to_firestore_value());
    fields.insert(
        "description".to_string(),
        video.description.to_firestore_value(),
    );
    fields.insert("tags".to_string(), video.tags.to_firestore_value());
    fields.insert("owner".to_string(), video.owner.as_str().to_firestore_value());
    fields.insert(
        "status".to_string(),
        video.status.as_str().to_firestore_value(),
    );

    let mut org_access = HashMap::new();
    org_access.insert(
        "enabled".to_string(),
        video.organization_access.enabled.to_firestore_value(),
    );
    org_access.insert(
        "role".to_string(),
        video.organization_access.role.as_str().to_firestore_value(),
    );
    fields.insert("organization_access".to_string(), Value::map(org_access));

    fields.insert(
        "group_access".to_string(),
        Value::array(
            video
                .group_access
                .iter()
                .map(|ga| {
                    let mut entry = HashMap::new();
                    entry.insert(
                        "group".to_string(),
                        ga.group.as_str().to_firestore_value(),
                    );
                    entry.insert("role".to_string(), ga.role.as_str().to_firestore_value());
                    Value::map(entry)
                })
                .collect(),
        ),
    );

    // Denormalized membership-query index.
    fields.insert(
        "access_group_ids".to_string(),
        Value::array(
            video
                .access_group_ids()
                .iter()
                .map(|g| g.as_str().to_firestore_value())
                .collect(),
        ),
    );

    fields.insert(
        "created_at".to_string(),
        video.created_at.to_firestore_value(),
    );
    fields.insert(
        "updated_at".to_string(),
        video.updated_at.to_firestore_value(),
    );
    fields
}

pub(crate) fn video_from_doc(doc: &Document) -> FirestoreResult<Video> {
    let organization_access = doc
        .field("organization_access")
        .and_then(|v| v.as_map())
        .map(|m| OrganizationAccess {
            enabled: m.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false),
            role: m
                .get("role")
                .and_then(|v| v.as_str())
                .and_then(Role::from_str)
                .unwrap_or(Role::Viewer),
        })
        .unwrap_or_default();

    let group_access = doc
        .field("group_access")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let m = entry.as_map()?;
                    let group = GroupId::from(m.get("group")?.as_str()?);
                    let role = m
                        .get("role")
                        .and_then(|v| v.as_str())
                        .and_then(Role::from_str)
                        .unwrap_or(Role::Viewer);
                    Some(GroupAccess::new(group, role))
                })
                .collect()
        })
        .unwrap_or_default();

    let status = doc
        .field("status")
        .and_then(|v| v.as_str())
        .and_then(VideoStatus::from_str)
        .ok_or_else(|| FirestoreError::invalid_response("video document missing status"))?;

    Ok(Video {
        id: VideoId::from(doc.require_str("id")?),
        file_key: doc.require_str("file_key")?,
        content_type: doc.require_str("content_type")?,
        name: doc.require_str("name")?,
        description: doc
            .field("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        tags: doc
            .field("tags")
            .and_then(|v| v.as_string_array())
            .unwrap_or_default(),
        owner: UserId::from(doc.require_str("owner")?),
        status,
        organization_access,
        group_access,
        created_at: doc.require_timestamp("created_at")?,
        updated_at: doc.require_timestamp("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video() -> Video {
        Video::new(
            UserId::from("owner-1"),
            "videos/owner-1/v1/clip.mp4",
            "video/mp4",
            "Launch demo",
            OrganizationAccess {
                enabled: true,
                role: Role::Editor,
            },
            vec![
                GroupAccess::new(GroupId::from("g1"), Role::Viewer),
                GroupAccess::new(GroupId::from("g2"), Role::Admin),
            ],
        )
        .with_description("quarterly launch recording")
        .with_tags(vec!["launch".into(), "demo".into()])
    }

    #[test]
    fn test_video_mapping_roundtrip() {
        let video = sample_video();
        let doc = Document::new(video_to_fields(&video));
        let restored = video_from_doc(&doc).unwrap();

        assert_eq!(restored.id, video.id);
        assert_eq!(restored.status, VideoStatus::Processing);
        assert_eq!(restored.group_access.len(), 2);
        assert_eq!(restored.group_access[0].role, Role::Viewer);
        assert_eq!(restored.group_access[1].group, GroupId::from("g2"));
        assert!(restored.organization_access.enabled);
        assert_eq!(restored.organization_access.role, Role::Editor);
        assert_eq!(restored.tags, vec!["launch", "demo"]);
    }

    #[test]
    fn test_video_fields_carry_access_index() {
        let video = sample_video();
        let fields = video_to_fields(&video);
        let index = fields
            .get("access_group_ids")
            .and_then(|v| v.as_string_array())
            .unwrap();
        assert_eq!(index, vec!["g1", "g2"]);
    }

    #[test]
    fn test_scope_from_filter() {
        assert_eq!(VideoScope::from_filter("mine"), VideoScope::Mine);
        assert_eq!(VideoScope::from_filter("shared"), VideoScope::Shared);
        assert_eq!(VideoScope::from_filter("anything"), VideoScope::All);
    }
}
