//! Group CRUD handlers.
//!
//! Authorization rules: any authenticated user may create a group; any
//! current member may update it; only the creator may delete it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use vshare_models::group::dedup_members;
use vshare_models::{membership_diff, Group, GroupId, GroupPatch, UserId};

use crate::auth::{current_user, AuthIdentity};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, message = "Group name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name.clone(),
            description: group.description.clone(),
            members: group.members.iter().map(|m| m.to_string()).collect(),
            created_by: group.created_by.to_string(),
            created_at: group.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupResponse>,
}

#[derive(Serialize)]
pub struct GroupMessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupResponse>,
}

/// Groups the caller belongs to or created.
pub async fn list_groups(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> ApiResult<Json<GroupsResponse>> {
    let user = current_user(&state, &identity).await?;
    let groups = state.groups.list_for_user(&user.id).await?;
    Ok(Json(GroupsResponse {
        groups: groups.iter().map(GroupResponse::from).collect(),
    }))
}

/// Create a group. The creator is implicitly a member.
pub async fn create_group(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<Response> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let user = current_user(&state, &identity).await?;

    let members: Vec<UserId> = request.members.into_iter().map(UserId::from).collect();
    let group = Group::new(
        request.name,
        request.description.unwrap_or_default(),
        members,
        user.id.clone(),
    );

    state.groups.create(&group).await?;

    Ok((
        StatusCode::CREATED,
        Json(GroupMessageResponse {
            message: "Group created successfully".to_string(),
            group: Some(GroupResponse::from(&group)),
        }),
    )
        .into_response())
}

/// Get a group; members and the creator only.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    identity: AuthIdentity,
) -> ApiResult<Json<GroupResponse>> {
    let user = current_user(&state, &identity).await?;

    let group = state
        .groups
        .get(&GroupId::from(group_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    if !group.has_member(&user.id) && !group.is_creator(&user.id) {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(Json(GroupResponse::from(&group)))
}

/// Update a group. Any current member may; the diff against the old member
/// list is applied to both sides of the bidirectional reference.
pub async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    identity: AuthIdentity,
    Json(patch): Json<GroupPatch>,
) -> ApiResult<Json<GroupMessageResponse>> {
    let user = current_user(&state, &identity).await?;

    let group_id = GroupId::from(group_id);
    let group = state
        .groups
        .get(&group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    if !group.has_member(&user.id) {
        return Err(ApiError::forbidden("Only group members can update the group"));
    }

    state
        .groups
        .update_details(&group_id, patch.name.as_deref(), patch.description.as_deref())
        .await?;

    if let Some(new_members) = &patch.members {
        let new_members = dedup_members(new_members.clone());
        let diff = membership_diff(&group.members, &new_members);
        if !diff.is_empty() {
            state
                .groups
                .update_members(&group_id, &new_members, &diff)
                .await?;
        }
    }

    let updated = state
        .groups
        .get(&group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    Ok(Json(GroupMessageResponse {
        message: "Group updated successfully".to_string(),
        group: Some(GroupResponse::from(&updated)),
    }))
}

/// Delete a group; creator only. Cascades the reference removal from every
/// remaining member.
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    identity: AuthIdentity,
) -> ApiResult<Json<GroupMessageResponse>> {
    let user = current_user(&state, &identity).await?;

    let group = state
        .groups
        .get(&GroupId::from(group_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    if !group.is_creator(&user.id) {
        return Err(ApiError::forbidden(
            "Only the group creator can delete this group",
        ));
    }

    state.groups.delete(&group).await?;

    Ok(Json(GroupMessageResponse {
        message: "Group deleted successfully".to_string(),
        group: None,
    }))
}
