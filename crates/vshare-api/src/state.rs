//! Application state.

use std::sync::Arc;

use vshare_firestore::{
    FirestoreClient, GroupRepository, OrganizationRepository, UserRepository, VideoRepository,
};
use vshare_queue::{EventChannel, JobQueue};
use vshare_storage::StorageClient;

use crate::auth::AuthKeys;
use crate::config::ApiConfig;

/// Shared application state. Everything the handlers touch is an explicit
/// capability wired here, including the notification channel.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub users: UserRepository,
    pub orgs: OrganizationRepository,
    pub groups: GroupRepository,
    pub videos: VideoRepository,
    pub storage: Arc<StorageClient>,
    pub queue: Arc<JobQueue>,
    pub events: Arc<EventChannel>,
    pub auth: Arc<AuthKeys>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let storage = StorageClient::from_env().await?;
        let queue = JobQueue::from_env()?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let events = EventChannel::new(&redis_url)?;

        let auth = AuthKeys::new(&config.jwt_secret, config.token_ttl);

        Ok(Self {
            users: UserRepository::new(firestore.clone()),
            orgs: OrganizationRepository::new(firestore.clone()),
            groups: GroupRepository::new(firestore.clone()),
            videos: VideoRepository::new(firestore),
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            events: Arc::new(events),
            auth: Arc::new(auth),
            config,
        })
    }
}
