//! Group repository.
//!
//! Membership is bidirectional (group.members and user.groups mirror each
//! other), so every membership mutation goes through one atomic commit
//! batch that touches the group document and every affected user document
//! together.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use vshare_models::{Group, GroupId, MembershipDiff, UserId};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::repos::USERS_COLLECTION;
use crate::types::{Document, Filter, StructuredQuery, ToFirestoreValue, Value, Write};

/// Collection holding group documents.
pub const GROUPS_COLLECTION: &str = "groups";

/// Repository for group documents.
#[derive(Clone)]
pub struct GroupRepository {
    client: FirestoreClient,
}

impl GroupRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get a group by ID.
    pub async fn get(&self, group_id: &GroupId) -> FirestoreResult<Option<Group>> {
        let doc = self
            .client
            .get_document(GROUPS_COLLECTION, group_id.as_str())
            .await?;
        doc.map(|d| group_from_doc(&d)).transpose()
    }

    /// Create a group and insert the group reference into every member's
    /// group set, atomically.
    pub async fn create(&self, group: &Group) -> FirestoreResult<()> {
        let group_ref = vec![group.id.as_str().to_firestore_value()];

        let mut writes = vec![Write::upsert(
            self.client.document_name(GROUPS_COLLECTION, group.id.as_str()),
            group_to_fields(group),
        )];
        for member in &group.members {
            writes.push(Write::array_union(
                self.client.document_name(USERS_COLLECTION, member.as_str()),
                "groups",
                group_ref.clone(),
            ));
        }

        self.client.commit(writes).await?;
        info!(group_id = %group.id, members = group.members.len(), "Created group");
        Ok(())
    }

    /// Rename / re-describe a group. Membership is untouched.
    pub async fn update_details(
        &self,
        group_id: &GroupId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        let mut mask = Vec::new();

        if let Some(name) = name {
            fields.insert("name".to_string(), name.to_firestore_value());
            mask.push("name".to_string());
        }
        if let Some(description) = description {
            fields.insert("description".to_string(), description.to_firestore_value());
            mask.push("description".to_string());
        }
        if mask.is_empty() {
            return Ok(());
        }

        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        mask.push("updated_at".to_string());

        self.client
            .update_document(GROUPS_COLLECTION, group_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Replace the member list and propagate the diff to both sides of the
    /// bidirectional reference in one atomic commit: the group document gets
    /// the new list, added users gain the group ref (append-missing, so a
    /// duplicate add is a no-op), removed users lose it.
    pub async fn update_members(
        &self,
        group_id: &GroupId,
        new_members: &[UserId],
        diff: &MembershipDiff,
    ) -> FirestoreResult<()> {
        let group_ref = vec![group_id.as_str().to_firestore_value()];

        let mut fields = HashMap::new();
        fields.insert(
            "members".to_string(),
            Value::array(
                new_members
                    .iter()
                    .map(|m| m.as_str().to_firestore_value())
                    .collect(),
            ),
        );
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let mut writes = vec![Write::update(
            self.client.document_name(GROUPS_COLLECTION, group_id.as_str()),
            fields,
            vec!["members".to_string(), "updated_at".to_string()],
        )];
        for added in &diff.added {
            writes.push(Write::array_union(
                self.client.document_name(USERS_COLLECTION, added.as_str()),
                "groups",
                group_ref.clone(),
            ));
        }
        for removed in &diff.removed {
            writes.push(Write::array_remove(
                self.client.document_name(USERS_COLLECTION, removed.as_str()),
                "groups",
                group_ref.clone(),
            ));
        }

        self.client.commit(writes).await?;
        info!(
            group_id = %group_id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Updated group membership"
        );
        Ok(())
    }

    /// Delete a group, cascading removal of the group reference from every
    /// remaining member, atomically.
    pub async fn delete(&self, group: &Group) -> FirestoreResult<()> {
        let group_ref = vec![group.id.as_str().to_firestore_value()];

        let mut writes = vec![Write::delete(
            self.client.document_name(GROUPS_COLLECTION, group.id.as_str()),
        )];
        for member in &group.members {
            writes.push(Write::array_remove(
                self.client.document_name(USERS_COLLECTION, member.as_str()),
                "groups",
                group_ref.clone(),
            ));
        }

        self.client.commit(writes).await?;
        info!(group_id = %group.id, "Deleted group");
        Ok(())
    }

    /// Groups the user belongs to or created, newest first.
    pub async fn list_for_user(&self, user_id: &UserId) -> FirestoreResult<Vec<Group>> {
        let query = StructuredQuery::collection(GROUPS_COLLECTION)
            .with_filter(Filter::or(vec![
                Filter::array_contains("members", user_id.as_str()),
                Filter::eq("created_by", user_id.as_str()),
            ]))
            .order_by_desc("created_at");
        let docs = self.client.run_query(query).await?;
        docs.iter().map(group_from_doc).collect()
    }
}

// ============================================================================
// Document mapping
// ============================================================================

pub(crate) fn group_to_fields(group: &Group) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), group.id.as_str().to_firestore_value());
    fields.insert("name".to_string(), group.name.to_firestore_value());
    fields.insert(
        "description".to_string(),
        group.description.to_firestore_value(),
    );
    fields.insert(
        "members".to_string(),
        Value::array(
            group
                .members
                .iter()
                .map(|m| m.as_str().to_firestore_value())
                .collect(),
        ),
    );
    fields.insert(
        "created_by".to_string(),
        group.created_by.as_str().to_firestore_value(),
    );
    fields.insert(
        "created_at".to_string(),
        group.created_at.to_firestore_value(),
    );
    fields.insert(
        "updated_at".to_string(),
        group.updated_at.to_firestore_value(),
    );
    fields
}

pub(crate) fn group_from_doc(doc: &Document) -> FirestoreResult<Group> {
    Ok(Group {
        id: GroupId::from(doc.require_str("id")?),
        name: doc.require_str("name")?,
        description: doc
            .field("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        members: doc
            .field("members")
            .and_then(|v| v.as_string_array())
            .unwrap_or_default()
            .into_iter()
            .map(UserId::from)
            .collect(),
        created_by: UserId::from(doc.require_str("created_by")?),
        created_at: doc.require_timestamp("created_at")?,
        updated_at: doc.require_timestamp("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_mapping_roundtrip() {
        let group = Group::new(
            "research",
            "weekly footage",
            vec![UserId::from("a"), UserId::from("b")],
            UserId::from("a"),
        );
        let doc = Document::new(group_to_fields(&group));
        let restored = group_from_doc(&doc).unwrap();

        assert_eq!(restored.id, group.id);
        assert_eq!(restored.members, group.members);
        assert_eq!(restored.created_by, UserId::from("a"));
        assert_eq!(restored.description, "weekly footage");
    }
}
