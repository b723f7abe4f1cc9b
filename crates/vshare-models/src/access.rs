//! Access-policy engine.
//!
//! Pure functions over data-model snapshots: the caller loads the video and
//! the requester's memberships, then asks what the requester may do. No I/O
//! happens here.
//!
//! Resolution is priority-ordered, first match wins:
//! 1. the owner is always `Admin`;
//! 2. the first group grant (in stored order) whose group the requester
//!    belongs to;
//! 3. the organization grant, when enabled and the requester belongs to an
//!    organization;
//! 4. otherwise no access.
//!
//! A granted `Admin` role is a content-editing privilege level, not
//! ownership: deletion requires being the literal owner.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::group::GroupId;
use crate::org::OrgId;
use crate::user::{User, UserId};
use crate::video::Video;

/// Privilege level granted to a non-owner over a video.
///
/// Totally ordered by privilege: `Viewer < Editor < Admin` (the derive uses
/// declaration order).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    /// Parse from the stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(Role::Viewer),
            "editor" => Some(Role::Editor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether this role allows editing video metadata.
    pub fn can_edit(&self) -> bool {
        match self {
            Role::Viewer => false,
            Role::Editor | Role::Admin => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organization-wide access grant attached to a video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct OrganizationAccess {
    /// Whether fellow organization members get access at all.
    #[serde(default)]
    pub enabled: bool,
    /// The role they get when enabled.
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Viewer
}

impl Default for OrganizationAccess {
    /// Disabled, viewer — the state of a freshly uploaded video with no
    /// explicit sharing configuration.
    fn default() -> Self {
        Self {
            enabled: false,
            role: Role::Viewer,
        }
    }
}

/// A (group, role) access grant attached to a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupAccess {
    pub group: GroupId,
    #[serde(default = "default_role")]
    pub role: Role,
}

impl GroupAccess {
    pub fn new(group: GroupId, role: Role) -> Self {
        Self { group, role }
    }

    /// Drop later entries for a group that already appeared; stored order
    /// is resolution priority, so first occurrence wins.
    pub fn dedup(grants: Vec<GroupAccess>) -> Vec<GroupAccess> {
        let mut seen = HashSet::new();
        grants
            .into_iter()
            .filter(|ga| seen.insert(ga.group.clone()))
            .collect()
    }
}

/// Snapshot of the requesting identity, as the policy engine needs it.
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: UserId,
    pub groups: HashSet<GroupId>,
    pub organization: Option<OrgId>,
}

impl Requester {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            groups: HashSet::new(),
            organization: None,
        }
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    pub fn with_organization(mut self, org: OrgId) -> Self {
        self.organization = Some(org);
        self
    }
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            groups: user.groups.iter().cloned().collect(),
            organization: user.organization.clone(),
        }
    }
}

/// Compute the effective role of `requester` over `video`.
///
/// First match wins — this is deliberately NOT an aggregate over all
/// matching grants. When the requester belongs to several granted groups,
/// the stored order of the access list decides.
pub fn resolve_role(video: &Video, requester: &Requester) -> Option<Role> {
    if video.owner == requester.user_id {
        return Some(Role::Admin);
    }

    if let Some(grant) = video
        .group_access
        .iter()
        .find(|ga| requester.groups.contains(&ga.group))
    {
        return Some(grant.role);
    }

    if requester.organization.is_some() && video.organization_access.enabled {
        return Some(video.organization_access.role);
    }

    None
}

/// Whether the requester may view or stream the video.
pub fn has_access(video: &Video, requester: &Requester) -> bool {
    resolve_role(video, requester).is_some()
}

/// Whether the requester may edit the video's metadata.
pub fn can_edit(video: &Video, requester: &Requester) -> bool {
    resolve_role(video, requester).is_some_and(|role| role.can_edit())
}

/// Whether the requester may delete the video. Only the literal owner may;
/// a group or organization grant of `Admin` does not qualify.
pub fn can_delete(video: &Video, requester: &Requester) -> bool {
    video.owner == requester.user_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Video;

    fn owner() -> UserId {
        UserId::from("owner")
    }

    fn video_with(org: OrganizationAccess, groups: Vec<GroupAccess>) -> Video {
        Video::new(owner(), "key", "video/mp4", "clip", org, groups)
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Admin);
    }

    #[test]
    fn test_owner_is_admin_regardless_of_grants() {
        // Even a viewer-level group grant covering the owner's own group
        // must not demote the owner.
        let video = video_with(
            OrganizationAccess {
                enabled: true,
                role: Role::Viewer,
            },
            vec![GroupAccess::new(GroupId::from("g1"), Role::Viewer)],
        );
        let requester = Requester::new(owner())
            .with_groups([GroupId::from("g1")])
            .with_organization(OrgId::from("o1"));
        assert_eq!(resolve_role(&video, &requester), Some(Role::Admin));
    }

    #[test]
    fn test_stranger_has_no_access() {
        let video = video_with(OrganizationAccess::default(), vec![]);
        let requester = Requester::new(UserId::from("stranger"));
        assert_eq!(resolve_role(&video, &requester), None);
        assert!(!has_access(&video, &requester));
    }

    #[test]
    fn test_group_grant_resolves() {
        let video = video_with(
            OrganizationAccess::default(),
            vec![GroupAccess::new(GroupId::from("g1"), Role::Editor)],
        );
        let member = Requester::new(UserId::from("b")).with_groups([GroupId::from("g1")]);
        assert_eq!(resolve_role(&video, &member), Some(Role::Editor));
        assert!(can_edit(&video, &member));
        assert!(!can_delete(&video, &member));
    }

    #[test]
    fn test_first_matching_group_wins_over_later_higher_grant() {
        // The requester is in both granted groups; the first entry in the
        // stored access list decides, even though the second grants more.
        // (Max-privilege-across-matches would answer Admin here.)
        let video = video_with(
            OrganizationAccess::default(),
            vec![
                GroupAccess::new(GroupId::from("g1"), Role::Viewer),
                GroupAccess::new(GroupId::from("g2"), Role::Admin),
            ],
        );
        let requester = Requester::new(UserId::from("b"))
            .with_groups([GroupId::from("g1"), GroupId::from("g2")]);
        assert_eq!(resolve_role(&video, &requester), Some(Role::Viewer));
    }

    #[test]
    fn test_group_grant_shadows_org_grant() {
        let video = video_with(
            OrganizationAccess {
                enabled: true,
                role: Role::Admin,
            },
            vec![GroupAccess::new(GroupId::from("g1"), Role::Viewer)],
        );
        let requester = Requester::new(UserId::from("b"))
            .with_groups([GroupId::from("g1")])
            .with_organization(OrgId::from("o1"));
        assert_eq!(resolve_role(&video, &requester), Some(Role::Viewer));
    }

    #[test]
    fn test_org_grant_requires_enabled() {
        // Organization access is disabled by default on a fresh upload: a
        // fellow org member with no group grant gets nothing.
        let video = video_with(OrganizationAccess::default(), vec![]);
        let requester =
            Requester::new(UserId::from("colleague")).with_organization(OrgId::from("o1"));
        assert_eq!(resolve_role(&video, &requester), None);
    }

    #[test]
    fn test_org_grant_requires_membership() {
        let video = video_with(
            OrganizationAccess {
                enabled: true,
                role: Role::Editor,
            },
            vec![],
        );
        let requester = Requester::new(UserId::from("loner"));
        assert_eq!(resolve_role(&video, &requester), None);
    }

    #[test]
    fn test_org_grant_resolves_when_enabled() {
        let video = video_with(
            OrganizationAccess {
                enabled: true,
                role: Role::Editor,
            },
            vec![],
        );
        let requester =
            Requester::new(UserId::from("colleague")).with_organization(OrgId::from("o1"));
        assert_eq!(resolve_role(&video, &requester), Some(Role::Editor));
    }

    #[test]
    fn test_granted_admin_cannot_delete() {
        let video = video_with(
            OrganizationAccess::default(),
            vec![GroupAccess::new(GroupId::from("g1"), Role::Admin)],
        );
        let requester = Requester::new(UserId::from("b")).with_groups([GroupId::from("g1")]);
        assert_eq!(resolve_role(&video, &requester), Some(Role::Admin));
        assert!(!can_delete(&video, &requester));
        assert!(can_delete(&video, &Requester::new(owner())));
    }

    #[test]
    fn test_viewer_cannot_edit() {
        let video = video_with(
            OrganizationAccess::default(),
            vec![GroupAccess::new(GroupId::from("g1"), Role::Viewer)],
        );
        let requester = Requester::new(UserId::from("b")).with_groups([GroupId::from("g1")]);
        assert!(has_access(&video, &requester));
        assert!(!can_edit(&video, &requester));
    }
}
