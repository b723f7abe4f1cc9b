//! Typed repositories for user and organization accounts.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use vshare_models::{OrgId, Organization, User, UserId, UserProfilePatch};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, Filter, StructuredQuery, ToFirestoreValue, Value};

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// Collection holding organization documents.
pub const ORGS_COLLECTION: &str = "organizations";

/// Directory listings are capped here; the UI only needs a picker.
const DIRECTORY_LIMIT: u32 = 500;

// ============================================================================
// Users
// ============================================================================

/// Repository for user documents.
#[derive(Clone)]
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &UserId) -> FirestoreResult<Option<User>> {
        let doc = self
            .client
            .get_document(USERS_COLLECTION, user_id.as_str())
            .await?;
        doc.map(|d| user_from_doc(&d)).transpose()
    }

    /// Look up a user by unique email.
    pub async fn get_by_email(&self, email: &str) -> FirestoreResult<Option<User>> {
        self.find_one(Filter::eq("email", email)).await
    }

    /// Look up a user by unique username.
    pub async fn get_by_username(&self, username: &str) -> FirestoreResult<Option<User>> {
        self.find_one(Filter::eq("username", username)).await
    }

    async fn find_one(&self, filter: Filter) -> FirestoreResult<Option<User>> {
        let query = StructuredQuery::collection(USERS_COLLECTION)
            .with_filter(filter)
            .with_limit(1);
        let docs = self.client.run_query(query).await?;
        docs.first().map(user_from_doc).transpose()
    }

    /// Create a new user record.
    pub async fn create(&self, user: &User) -> FirestoreResult<()> {
        self.client
            .create_document(USERS_COLLECTION, user.id.as_str(), user_to_fields(user))
            .await?;
        info!(user_id = %user.id, "Created user record");
        Ok(())
    }

    /// Apply a presence-aware profile patch as a single masked update.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &UserProfilePatch,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        let mut mask = Vec::new();

        if let Some(name) = &patch.name {
            fields.insert("name".to_string(), name.to_firestore_value());
            mask.push("name".to_string());
        }
        if let Some(mobile) = &patch.mobile_number {
            fields.insert("mobile_number".to_string(), mobile.to_firestore_value());
            mask.push("mobile_number".to_string());
        }
        if let Some(org) = &patch.organization {
            fields.insert(
                "organization".to_string(),
                org.as_str().to_firestore_value(),
            );
            mask.push("organization".to_string());
        }
        if mask.is_empty() {
            return Ok(());
        }

        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        mask.push("updated_at".to_string());

        self.client
            .update_document(USERS_COLLECTION, user_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// List user accounts for the group-creation directory.
    pub async fn list(&self) -> FirestoreResult<Vec<User>> {
        let query = StructuredQuery::collection(USERS_COLLECTION).with_limit(DIRECTORY_LIMIT);
        let docs = self.client.run_query(query).await?;
        docs.iter().map(user_from_doc).collect()
    }
}

// ============================================================================
// Organizations
// ============================================================================

/// Repository for organization documents.
#[derive(Clone)]
pub struct OrganizationRepository {
    client: FirestoreClient,
}

impl OrganizationRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get an organization by ID.
    pub async fn get(&self, org_id: &OrgId) -> FirestoreResult<Option<Organization>> {
        let doc = self
            .client
            .get_document(ORGS_COLLECTION, org_id.as_str())
            .await?;
        doc.map(|d| org_from_doc(&d)).transpose()
    }

    /// Look up an organization by unique code (case-insensitive).
    pub async fn get_by_code(&self, org_code: &str) -> FirestoreResult<Option<Organization>> {
        self.find_one(Filter::eq("org_code", org_code.to_uppercase()))
            .await
    }

    /// Look up an organization by unique email.
    pub async fn get_by_email(&self, email: &str) -> FirestoreResult<Option<Organization>> {
        self.find_one(Filter::eq("email", email)).await
    }

    async fn find_one(&self, filter: Filter) -> FirestoreResult<Option<Organization>> {
        let query = StructuredQuery::collection(ORGS_COLLECTION)
            .with_filter(filter)
            .with_limit(1);
        let docs = self.client.run_query(query).await?;
        docs.first().map(org_from_doc).transpose()
    }

    /// Create a new organization record.
    pub async fn create(&self, org: &Organization) -> FirestoreResult<()> {
        self.client
            .create_document(ORGS_COLLECTION, org.id.as_str(), org_to_fields(org))
            .await?;
        info!(org_id = %org.id, "Created organization record");
        Ok(())
    }

    /// List organizations for the registration directory.
    pub async fn list(&self) -> FirestoreResult<Vec<Organization>> {
        let query = StructuredQuery::collection(ORGS_COLLECTION).with_limit(DIRECTORY_LIMIT);
        let docs = self.client.run_query(query).await?;
        docs.iter().map(org_from_doc).collect()
    }
}

// ============================================================================
// Document mapping
// ============================================================================

pub(crate) fn user_to_fields(user: &User) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), user.id.as_str().to_firestore_value());
    fields.insert("name".to_string(), user.name.to_firestore_value());
    fields.insert("username".to_string(), user.username.to_firestore_value());
    fields.insert("email".to_string(), user.email.to_firestore_value());
    fields.insert(
        "password_hash".to_string(),
        user.password_hash.to_firestore_value(),
    );
    if let Some(mobile) = &user.mobile_number {
        fields.insert("mobile_number".to_string(), mobile.to_firestore_value());
    }
    if let Some(org) = &user.organization {
        fields.insert(
            "organization".to_string(),
            org.as_str().to_firestore_value(),
        );
    }
    fields.insert(
        "groups".to_string(),
        Value::array(
            user.groups
                .iter()
                .map(|g| g.as_str().to_firestore_value())
                .collect(),
        ),
    );
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());
    fields
}

pub(crate) fn user_from_doc(doc: &Document) -> FirestoreResult<User> {
    Ok(User {
        id: UserId::from(doc.require_str("id")?),
        name: doc.require_str("name")?,
        username: doc.require_str("username")?,
        email: doc.require_str("email")?,
        password_hash: doc.require_str("password_hash")?,
        mobile_number: doc
            .field("mobile_number")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        organization: doc
            .field("organization")
            .and_then(|v| v.as_str())
            .map(OrgId::from),
        groups: doc
            .field("groups")
            .and_then(|v| v.as_string_array())
            .unwrap_or_default()
            .into_iter()
            .map(vshare_models::GroupId::from)
            .collect(),
        created_at: doc.require_timestamp("created_at")?,
        updated_at: doc.require_timestamp("updated_at")?,
    })
}

pub(crate) fn org_to_fields(org: &Organization) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), org.id.as_str().to_firestore_value());
    fields.insert("name".to_string(), org.name.to_firestore_value());
    fields.insert(
        "description".to_string(),
        org.description.to_firestore_value(),
    );
    fields.insert("org_code".to_string(), org.org_code.to_firestore_value());
    fields.insert("email".to_string(), org.email.to_firestore_value());
    fields.insert(
        "password_hash".to_string(),
        org.password_hash.to_firestore_value(),
    );
    if let Some(address) = &org.address {
        fields.insert("address".to_string(), address.to_firestore_value());
    }
    fields.insert("mobile".to_string(), org.mobile.to_firestore_value());
    fields.insert("created_at".to_string(), org.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), org.updated_at.to_firestore_value());
    fields
}

pub(crate) fn org_from_doc(doc: &Document) -> FirestoreResult<Organization> {
    Ok(Organization {
        id: OrgId::from(doc.require_str("id")?),
        name: doc.require_str("name")?,
        description: doc
            .field("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        org_code: doc.require_str("org_code")?,
        email: doc.require_str("email")?,
        password_hash: doc.require_str("password_hash")?,
        address: doc
            .field("address")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        mobile: doc.require_str("mobile")?,
        created_at: doc.require_timestamp("created_at")?,
        updated_at: doc.require_timestamp("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vshare_models::GroupId;

    #[test]
    fn test_user_mapping_roundtrip() {
        let user = User::new("Ada", "ada", "ada@example.com", "$argon2id$stub")
            .with_organization(OrgId::from("org-1"))
            .with_mobile_number("555-0100");
        let mut user = user;
        user.groups = vec![GroupId::from("g1"), GroupId::from("g2")];

        let doc = Document::new(user_to_fields(&user));
        let restored = user_from_doc(&doc).unwrap();

        assert_eq!(restored.id, user.id);
        assert_eq!(restored.username, "ada");
        assert_eq!(restored.organization, Some(OrgId::from("org-1")));
        assert_eq!(restored.groups, user.groups);
    }

    #[test]
    fn test_user_mapping_optional_fields_absent() {
        let user = User::new("Bo", "bo", "bo@example.com", "$hash");
        let doc = Document::new(user_to_fields(&user));
        let restored = user_from_doc(&doc).unwrap();
        assert!(restored.mobile_number.is_none());
        assert!(restored.organization.is_none());
        assert!(restored.groups.is_empty());
    }

    #[test]
    fn test_org_mapping_roundtrip() {
        let org = Organization::new("Acme", "acme", "ops@acme.io", "$hash", "555-0100")
            .with_address("1 Main St");
        let doc = Document::new(org_to_fields(&org));
        let restored = org_from_doc(&doc).unwrap();
        assert_eq!(restored.org_code, "ACME");
        assert_eq!(restored.address.as_deref(), Some("1 Main St"));
    }
}
