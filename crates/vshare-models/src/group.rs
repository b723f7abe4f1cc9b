//! Group models and membership-diff logic.
//!
//! Groups and users reference each other bidirectionally: a user appears in
//! `group.members` iff the group appears in `user.groups`. The diff helpers
//! here compute the member-set changes an update has to apply to keep both
//! sides in sync.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::user::UserId;

/// Unique identifier for a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named collection of users.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Group {
    /// Unique group ID
    pub id: GroupId,

    /// Group name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Member set. Set semantics: each user appears at most once.
    #[serde(default)]
    pub members: Vec<UserId>,

    /// The user who created the group. Immutable; only the creator may
    /// delete the group.
    pub created_by: UserId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Create a new group. The creator is implicitly added to the member
    /// list if absent, and duplicate members are dropped.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        members: Vec<UserId>,
        created_by: UserId,
    ) -> Self {
        let mut members = dedup_members(members);
        if !members.contains(&created_by) {
            members.push(created_by.clone());
        }
        let now = Utc::now();
        Self {
            id: GroupId::new(),
            name: name.into(),
            description: description.into(),
            members,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given user is currently a member.
    pub fn has_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Whether the given user created the group.
    pub fn is_creator(&self, user: &UserId) -> bool {
        self.created_by == *user
    }
}

/// Drop duplicate user references, keeping first occurrence order.
pub fn dedup_members(members: Vec<UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

/// The member-set changes a group update has to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Users present in the new list but not the old: gain the group ref.
    pub added: Vec<UserId>,
    /// Users present in the old list but not the new: lose the group ref.
    pub removed: Vec<UserId>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute `added = new ∖ old` and `removed = old ∖ new` with set
/// semantics: duplicates in either input count once, so re-adding an
/// existing member is a no-op on both sides.
pub fn membership_diff(old: &[UserId], new: &[UserId]) -> MembershipDiff {
    let old_set: HashSet<&UserId> = old.iter().collect();
    let new_set: HashSet<&UserId> = new.iter().collect();

    let added = dedup_members(
        new.iter()
            .filter(|u| !old_set.contains(*u))
            .cloned()
            .collect(),
    );
    let removed = dedup_members(
        old.iter()
            .filter(|u| !new_set.contains(*u))
            .cloned()
            .collect(),
    );

    MembershipDiff { added, removed }
}

/// Presence-aware group update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Full replacement member list; the diff against the current list is
    /// applied to both sides of the bidirectional reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<UserId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    #[test]
    fn test_creator_implicitly_added() {
        let group = Group::new("team", "", vec![uid("a"), uid("b")], uid("c"));
        assert!(group.has_member(&uid("c")));
        assert_eq!(group.members.len(), 3);
    }

    #[test]
    fn test_creator_not_duplicated() {
        let group = Group::new("team", "", vec![uid("a"), uid("c")], uid("c"));
        assert_eq!(group.members.len(), 2);
    }

    #[test]
    fn test_duplicate_members_dropped_on_create() {
        let group = Group::new("team", "", vec![uid("a"), uid("a"), uid("b")], uid("b"));
        assert_eq!(group.members, vec![uid("a"), uid("b")]);
    }

    #[test]
    fn test_membership_diff_added_and_removed() {
        let old = vec![uid("a"), uid("b"), uid("c")];
        let new = vec![uid("b"), uid("c"), uid("d")];
        let diff = membership_diff(&old, &new);
        assert_eq!(diff.added, vec![uid("d")]);
        assert_eq!(diff.removed, vec![uid("a")]);
    }

    #[test]
    fn test_membership_diff_idempotent_re_add() {
        // A user already in the group appearing again in the new list must
        // not show up as added.
        let old = vec![uid("a"), uid("b")];
        let new = vec![uid("a"), uid("a"), uid("b")];
        let diff = membership_diff(&old, &new);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_membership_diff_duplicates_count_once() {
        let old: Vec<UserId> = vec![];
        let new = vec![uid("x"), uid("x")];
        let diff = membership_diff(&old, &new);
        assert_eq!(diff.added, vec![uid("x")]);
    }
}
