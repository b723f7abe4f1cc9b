//! Shared data models for the VidShare backend.
//!
//! Pure types and policy logic only: the access-policy engine in [`access`]
//! operates on in-memory snapshots and performs no I/O.

pub mod access;
pub mod events;
pub mod group;
pub mod org;
pub mod page;
pub mod user;
pub mod video;

pub use access::{
    can_delete, can_edit, has_access, resolve_role, GroupAccess, OrganizationAccess, Requester,
    Role,
};
pub use events::NotificationEvent;
pub use group::{membership_diff, Group, GroupId, GroupPatch, MembershipDiff};
pub use org::{OrgId, Organization};
pub use page::{Page, PageRequest};
pub use user::{AccountKind, User, UserId, UserProfilePatch};
pub use video::{Video, VideoId, VideoPatch, VideoStatus};
