//! User account models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::group::GroupId;
use crate::org::OrgId;

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which kind of account a session token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Organization,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Organization => "organization",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Unique username
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2 credential hash (never serialized to clients)
    pub password_hash: String,

    /// Optional mobile number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,

    /// The organization this user belongs to, if any (at most one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrgId>,

    /// Groups this user is a member of. Set semantics: a group appears
    /// at most once, mirrored by the group's member list.
    #[serde(default)]
    pub groups: Vec<GroupId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record.
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            mobile_number: None,
            organization: None,
            groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the organization association.
    pub fn with_organization(mut self, org: OrgId) -> Self {
        self.organization = Some(org);
        self
    }

    /// Set the mobile number.
    pub fn with_mobile_number(mut self, mobile: impl Into<String>) -> Self {
        self.mobile_number = Some(mobile.into());
        self
    }

    /// Whether this user is a member of the given group.
    pub fn in_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }
}

/// Presence-aware profile update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrgId>,
}

impl UserProfilePatch {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.mobile_number.is_none() && self.organization.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_generation() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_user_has_no_memberships() {
        let user = User::new("Ada", "ada", "ada@example.com", "$argon2id$stub");
        assert!(user.groups.is_empty());
        assert!(user.organization.is_none());
        assert!(!user.in_group(&GroupId::new()));
    }

    #[test]
    fn test_account_kind_roundtrip() {
        let json = serde_json::to_string(&AccountKind::Organization).unwrap();
        assert_eq!(json, "\"organization\"");
        let kind: AccountKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, AccountKind::Organization);
    }
}
