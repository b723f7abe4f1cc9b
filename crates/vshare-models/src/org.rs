//! Organization account models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct OrgId(pub String);

impl OrgId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An organization account. Users reference an organization loosely; the
/// organization does not own its users.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Organization {
    /// Unique organization ID
    pub id: OrgId,

    /// Display name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Unique organization code, stored uppercase, used for login
    pub org_code: String,

    /// Unique email address
    pub email: String,

    /// Argon2 credential hash
    pub password_hash: String,

    /// Postal address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Contact mobile number
    pub mobile: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization record. The org code is normalized to
    /// uppercase so lookups are case-insensitive.
    pub fn new(
        name: impl Into<String>,
        org_code: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        mobile: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrgId::new(),
            name: name.into(),
            description: String::new(),
            org_code: org_code.into().to_uppercase(),
            email: email.into(),
            password_hash: password_hash.into(),
            address: None,
            mobile: mobile.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_code_normalized_uppercase() {
        let org = Organization::new("Acme", "acme-01", "ops@acme.io", "$hash", "555-0100");
        assert_eq!(org.org_code, "ACME-01");
    }
}
