//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::auth::{
    login_organization, login_user, logout, me, register_organization, register_user,
};
use crate::handlers::directory::{list_organizations, list_users, update_profile};
use crate::handlers::groups::{create_group, delete_group, get_group, list_groups, update_group};
use crate::handlers::videos::{
    delete_video, get_video, list_videos, stream_video, update_video, upload_video,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/register-organization", post(register_organization))
        .route("/auth/login", post(login_user))
        .route("/auth/login-organization", post(login_organization))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me));

    let directory_routes = Router::new()
        .route("/users", get(list_users))
        .route("/users/me", patch(update_profile))
        .route("/organizations", get(list_organizations));

    let group_routes = Router::new()
        .route("/groups", get(list_groups))
        .route("/groups", post(create_group))
        .route("/groups/:group_id", get(get_group))
        .route("/groups/:group_id", put(update_group))
        .route("/groups/:group_id", delete(delete_group));

    let video_routes = Router::new()
        .route("/videos", post(upload_video))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id", patch(update_video))
        .route("/videos/:video_id", delete(delete_video))
        .route("/videos/:video_id/stream", get(stream_video));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(directory_routes)
        .merge(group_routes)
        .merge(video_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let ws_routes = Router::new().route("/ws/events", get(ws_events));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads come through the JSON/multipart body; cap it.
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
