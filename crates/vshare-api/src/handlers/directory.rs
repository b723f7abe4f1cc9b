//! Account directory and profile handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use vshare_models::UserProfilePatch;

use crate::auth::{current_user, AuthIdentity};
use crate::error::ApiResult;
use crate::handlers::auth::{OrgPublic, UserPublic};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserPublic>,
}

/// User directory, for picking group members.
pub async fn list_users(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> ApiResult<Json<UsersResponse>> {
    // Any authenticated user account may browse the directory.
    current_user(&state, &identity).await?;

    let users = state.users.list().await?;
    Ok(Json(UsersResponse {
        users: users.iter().map(UserPublic::from).collect(),
    }))
}

#[derive(Serialize)]
pub struct OrganizationsResponse {
    pub organizations: Vec<OrgPublic>,
}

/// Organization directory, for registration.
pub async fn list_organizations(
    State(state): State<AppState>,
) -> ApiResult<Json<OrganizationsResponse>> {
    let orgs = state.orgs.list().await?;
    Ok(Json(OrganizationsResponse {
        organizations: orgs.iter().map(OrgPublic::from).collect(),
    }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserPublic,
}

/// Presence-aware profile update for the current user.
pub async fn update_profile(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(patch): Json<UserProfilePatch>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = current_user(&state, &identity).await?;

    if !patch.is_empty() {
        state.users.update_profile(&user.id, &patch).await?;
    }

    let mut updated = user;
    if let Some(name) = patch.name {
        updated.name = name;
    }
    if let Some(mobile) = patch.mobile_number {
        updated.mobile_number = Some(mobile);
    }
    if let Some(org) = patch.organization {
        updated.organization = Some(org);
    }

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserPublic::from(&updated),
    }))
}
