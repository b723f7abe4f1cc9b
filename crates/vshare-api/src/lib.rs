//! Axum HTTP/WS API server for VidShare.
//!
//! Session auth for users and organizations, group management, video
//! upload/listing/streaming behind the access-policy engine, and the
//! WebSocket notification endpoint.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
