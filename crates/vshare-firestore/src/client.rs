//! Firestore REST API client.
//!
//! Thin, typed wrapper over the Firestore v1 REST surface with token
//! caching, exponential-backoff retry, and optimistic-concurrency updates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::TokenCache;
use crate::types::{
    Aggregation, CommitRequest, CommitResponse, Document, RunAggregationQueryRequest,
    RunAggregationQueryResponseItem, RunQueryRequest, RunQueryResponseItem,
    StructuredAggregationQuery, StructuredQuery, Value, Write,
};

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .map_err(|_| FirestoreError::auth_error("GCP_PROJECT_ID must be set"))?;
        if project_id.is_empty() {
            return Err(FirestoreError::auth_error("GCP_PROJECT_ID cannot be empty"));
        }

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(
                std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Firestore REST API client.
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = Self::create_auth_provider()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vshare-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(auth)),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Fully-qualified document resource name, as commit writes need it.
    pub fn document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Send an authenticated request and surface expired tokens as a
    /// retryable error (the retry wrapper re-enters with a fresh token).
    async fn send(&self, build: impl FnOnce(String) -> RequestBuilder) -> FirestoreResult<Response> {
        let token = self.token_cache.get_token().await?;
        let response = build(token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            return Err(FirestoreError::AuthExpired);
        }

        Ok(response)
    }

    async fn error_from(response: Response) -> FirestoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status, body)
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Get a document, `None` when absent.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        with_retry(&self.config.retry, "get_document", || async {
            let response = self
                .send(|token| self.http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                _ => Err(Self::error_from(response).await),
            }
        })
        .await
    }

    /// Create a document; fails with `AlreadyExists` when the ID is taken.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let body = Document::new(fields);

        with_retry(&self.config.retry, "create_document", || async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json::<Document>().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                _ => Err(Self::error_from(response).await),
            }
        })
        .await
    }

    /// Update a document, merging only the masked fields when a mask is
    /// given. Each call is a single atomic write against the document.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        let mut url = self.document_url(collection, doc_id);
        if let Some(mask) = &update_mask {
            let params: Vec<String> = mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", f))
                .collect();
            url = format!("{}?{}", url, params.join("&"));
        }
        let body = Document::new(fields);

        with_retry(&self.config.retry, "update_document", || async {
            let response = self
                .send(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                    let detail = response.text().await.unwrap_or_default();
                    Err(FirestoreError::PreconditionFailed(detail))
                }
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                _ => Err(Self::error_from(response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting an absent document is a no-op.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_url(collection, doc_id);

        with_retry(&self.config.retry, "delete_document", || async {
            let response = self
                .send(|token| self.http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                _ => Err(Self::error_from(response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Run a structured query and return the matching documents.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let request = RunQueryRequest {
            structured_query: query,
        };

        with_retry(&self.config.retry, "run_query", || async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            if response.status() != StatusCode::OK {
                return Err(Self::error_from(response).await);
            }

            // runQuery streams a JSON array of result items; items without
            // a document are progress markers.
            let items: Vec<RunQueryResponseItem> = response.json().await?;
            Ok(items.into_iter().filter_map(|item| item.document).collect())
        })
        .await
    }

    /// Count the documents matching a query via a server-side aggregation.
    pub async fn count(&self, query: StructuredQuery) -> FirestoreResult<u64> {
        let url = format!("{}:runAggregationQuery", self.base_url);
        let request = RunAggregationQueryRequest {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query: query.unpaged(),
                aggregations: vec![Aggregation::count("total")],
            },
        };

        with_retry(&self.config.retry, "count", || async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            if response.status() != StatusCode::OK {
                return Err(Self::error_from(response).await);
            }

            let items: Vec<RunAggregationQueryResponseItem> = response.json().await?;
            let total = items
                .into_iter()
                .find_map(|item| item.result)
                .and_then(|r| r.aggregate_fields.get("total").and_then(|v| v.as_i64()))
                .ok_or_else(|| {
                    FirestoreError::invalid_response("aggregation response missing total")
                })?;
            Ok(total.max(0) as u64)
        })
        .await
    }

    // =========================================================================
    // Atomic multi-document writes
    // =========================================================================

    /// Apply a batch of writes atomically (`documents:commit`): either all
    /// writes land or none do. This is what keeps the group/user
    /// bidirectional references in sync.
    pub async fn commit(&self, writes: Vec<Write>) -> FirestoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let url = format!("{}:commit", self.base_url);
        let request = CommitRequest { writes };

        with_retry(&self.config.retry, "commit", || async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let _body: CommitResponse = response.json().await?;
                    Ok(())
                }
                _ => Err(Self::error_from(response).await),
            }
        })
        .await
    }
}
