//! Video handlers: upload, library listing, metadata CRUD, streaming.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vshare_firestore::VideoScope;
use vshare_models::{
    can_delete, can_edit, resolve_role, GroupAccess, NotificationEvent, OrganizationAccess, Page,
    PageRequest, Requester, Video, VideoId, VideoPatch,
};
use vshare_queue::{QueueError, SensitivityScanJob};
use vshare_storage::StorageClient;

use crate::auth::{current_user, AuthIdentity};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: String,
    pub content_type: String,
    pub owner: String,
    pub organization_access: OrganizationAccess,
    pub group_access: Vec<GroupAccess>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Video> for VideoResponse {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.to_string(),
            name: video.name.clone(),
            description: video.description.clone(),
            tags: video.tags.clone(),
            status: video.status.as_str().to_string(),
            content_type: video.content_type.clone(),
            owner: video.owner.to_string(),
            organization_access: video.organization_access,
            group_access: video.group_access.clone(),
            created_at: video.created_at.to_rfc3339(),
            updated_at: video.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct UploadVideoResponse {
    pub message: String,
    pub video: VideoResponse,
}

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Serialize)]
pub struct ListVideosResponse {
    pub videos: Vec<VideoResponse>,
    pub pagination: PaginationInfo,
}

#[derive(Serialize)]
pub struct GetVideoResponse {
    pub video: VideoResponse,
    pub user_role: String,
}

#[derive(Serialize)]
pub struct UpdateVideoResponse {
    pub message: String,
    pub video: VideoResponse,
}

#[derive(Serialize)]
pub struct DeleteVideoResponse {
    pub message: String,
    pub video_id: String,
    /// False when the backing file could not be removed; the metadata
    /// record is deleted regardless.
    pub file_deleted: bool,
}

// ============================================================================
// Upload
// ============================================================================

/// Multipart fields collected from an upload request.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, String, Vec<u8>)>, // (filename, content type, bytes)
    name: Option<String>,
    description: Option<String>,
    tags: Option<String>,
    organization_access: Option<String>,
    group_access: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = sanitize_filename(field.file_name().unwrap_or("upload.bin"));
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read upload: {}", e)))?;
                form.file = Some((filename, content_type, bytes.to_vec()));
            }
            Some("name") => form.name = Some(read_text(field).await?),
            Some("description") => form.description = Some(read_text(field).await?),
            Some("tags") => form.tags = Some(read_text(field).await?),
            Some("organization_access") => {
                form.organization_access = Some(read_text(field).await?)
            }
            Some("group_access") => form.group_access = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart field: {}", e)))
}

/// Keep uploads from smuggling path segments into storage keys.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() || base == "." || base == ".." {
        "upload.bin".to_string()
    } else {
        base.to_string()
    }
}

/// Upload a video.
///
/// Persists the file and metadata (status `processing`), enqueues the
/// sensitivity scan, and returns immediately — the scan result arrives on
/// the owner's notification channel.
pub async fn upload_video(
    State(state): State<AppState>,
    identity: AuthIdentity,
    multipart: Multipart,
) -> ApiResult<Response> {
    let user = current_user(&state, &identity).await?;
    let form = read_upload_form(multipart).await?;

    let (filename, content_type, bytes) = form
        .file
        .ok_or_else(|| ApiError::validation("No video file uploaded"))?;
    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Video name is required"))?;

    let tags: Vec<String> = form
        .tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let organization_access: OrganizationAccess = match form.organization_access {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| ApiError::validation(format!("Invalid organization_access: {}", e)))?,
        None => OrganizationAccess::default(),
    };
    let group_access: Vec<GroupAccess> = match form.group_access {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| ApiError::validation(format!("Invalid group_access: {}", e)))?,
        None => Vec::new(),
    };

    let mut video = Video::new(
        user.id.clone(),
        String::new(),
        content_type.clone(),
        name,
        organization_access,
        group_access,
    )
    .with_description(form.description.unwrap_or_default())
    .with_tags(tags);
    video.file_key = StorageClient::video_key(user.id.as_str(), video.id.as_str(), &filename);

    state
        .storage
        .upload_bytes(bytes, &video.file_key, &content_type)
        .await?;
    state.videos.create(&video).await?;

    // Kick off the detached moderation workflow; at most one scan per
    // upload thanks to the job's idempotency key.
    let job = SensitivityScanJob::new(video.id.clone(), user.id.clone(), &video.file_key);
    match state.queue.enqueue_scan(&job).await {
        Ok(_) => {}
        Err(QueueError::Duplicate(key)) => {
            warn!(video_id = %video.id, "Scan already enqueued: {}", key)
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = state
        .events
        .publish(&user.id, NotificationEvent::upload_complete(video.id.clone()))
        .await
    {
        warn!(video_id = %video.id, "Failed to publish upload event: {}", e);
    }

    info!(video_id = %video.id, owner = %user.id, "Video uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadVideoResponse {
            message: "Video uploaded successfully".to_string(),
            video: VideoResponse::from(&video),
        }),
    )
        .into_response())
}

// ============================================================================
// Library
// ============================================================================

/// List the caller's library: own videos, shared videos, or both.
pub async fn list_videos(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<ListVideosResponse>> {
    let user = current_user(&state, &identity).await?;
    let requester = Requester::from(&user);

    let scope = VideoScope::from_filter(query.filter.as_deref().unwrap_or("all"));
    let page = PageRequest::clamped(query.page.unwrap_or(1), query.limit.unwrap_or(12));

    let (videos, total) = state.videos.list(&requester, scope, page).await?;
    let result = Page::new(
        videos.iter().map(VideoResponse::from).collect(),
        page,
        total,
    );

    Ok(Json(ListVideosResponse {
        videos: result.items,
        pagination: PaginationInfo {
            page: result.page,
            limit: result.page_size,
            total: result.total,
            pages: result.pages,
        },
    }))
}

/// Load a video and the caller's user snapshot, without authorization.
async fn load_video(
    state: &AppState,
    identity: &AuthIdentity,
    video_id: &str,
) -> ApiResult<(Video, Requester)> {
    let user = current_user(state, identity).await?;
    let video = state
        .videos
        .get(&VideoId::from(video_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok((video, Requester::from(&user)))
}

/// Get a video plus the caller's effective role.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    identity: AuthIdentity,
) -> ApiResult<Json<GetVideoResponse>> {
    let (video, requester) = load_video(&state, &identity, &video_id).await?;

    let role = resolve_role(&video, &requester)
        .ok_or_else(|| ApiError::forbidden("Access denied"))?;

    Ok(Json(GetVideoResponse {
        video: VideoResponse::from(&video),
        user_role: role.as_str().to_string(),
    }))
}

/// Update video metadata; editor or admin role required. Only provided
/// fields overwrite — an explicitly empty description clears it, an absent
/// one keeps the stored value.
pub async fn update_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    identity: AuthIdentity,
    Json(patch): Json<VideoPatch>,
) -> ApiResult<Json<UpdateVideoResponse>> {
    let (mut video, requester) = load_video(&state, &identity, &video_id).await?;

    if !can_edit(&video, &requester) {
        return Err(ApiError::forbidden(
            "You do not have permission to edit this video",
        ));
    }

    state.videos.apply_patch(&video.id, &patch).await?;
    video.apply_patch(&patch);

    Ok(Json(UpdateVideoResponse {
        message: "Video updated successfully".to_string(),
        video: VideoResponse::from(&video),
    }))
}

/// Delete a video; the literal owner only. A granted admin role is an
/// editing privilege, not ownership.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    identity: AuthIdentity,
) -> ApiResult<Json<DeleteVideoResponse>> {
    let (video, requester) = load_video(&state, &identity, &video_id).await?;

    if !can_delete(&video, &requester) {
        return Err(ApiError::forbidden(
            "Only the video owner can delete this video",
        ));
    }

    // File first; a storage failure is surfaced but does not keep the
    // metadata record alive.
    let file_deleted = match state.storage.delete_object(&video.file_key).await {
        Ok(()) => true,
        Err(e) => {
            warn!(video_id = %video.id, "Failed to delete backing file: {}", e);
            false
        }
    };

    state.videos.delete(&video.id).await?;

    info!(video_id = %video.id, file_deleted, "Video deleted");

    Ok(Json(DeleteVideoResponse {
        message: "Video deleted successfully".to_string(),
        video_id: video.id.to_string(),
        file_deleted,
    }))
}

// ============================================================================
// Streaming
// ============================================================================

/// Stream a video with byte-range support. Any role grants playback.
pub async fn stream_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    identity: AuthIdentity,
) -> ApiResult<Response> {
    let (video, requester) = load_video(&state, &identity, &video_id).await?;

    if resolve_role(&video, &requester).is_none() {
        return Err(ApiError::forbidden("Access denied"));
    }

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let object = state
        .storage
        .get_object_range(&video.file_key, range_header.as_deref())
        .await
        .map_err(|e| {
            if matches!(e, vshare_storage::StorageError::NotFound(_)) {
                ApiError::not_found("Video file not found")
            } else {
                ApiError::Storage(e)
            }
        })?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, video.content_type.as_str())
        .header(header::ACCEPT_RANGES, "bytes");

    match object.content_range.as_deref() {
        Some(content_range) => {
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, content_range)
                .header(header::CONTENT_LENGTH, object.bytes.len());
        }
        None => {
            builder = builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, object.total_size);
        }
    }

    builder
        .body(Body::from(object.bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a\\b\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename(""), "upload.bin");
        assert_eq!(sanitize_filename(".."), "upload.bin");
    }
}
