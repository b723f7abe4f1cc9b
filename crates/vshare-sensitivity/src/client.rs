//! Sensitivity service HTTP client.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{SensitivityError, SensitivityResult};
use crate::types::{AnalyzeRequest, SensitivityVerdict};

/// The classifier interface the moderation workflow runs against. The
/// production implementation is [`SensitivityClient`]; tests substitute
/// in-memory stubs.
pub trait SensitivityAnalyzer: Send + Sync {
    /// Classify the video behind `media_url`. May fail; callers decide the
    /// fail-open policy.
    fn analyze(
        &self,
        media_url: &str,
    ) -> impl Future<Output = SensitivityResult<SensitivityVerdict>> + Send;
}

/// Configuration for the sensitivity client.
#[derive(Debug, Clone)]
pub struct SensitivityConfig {
    /// Base URL of the sensitivity service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max transport retries within one analyze call
    pub max_retries: u32,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 1,
        }
    }
}

impl SensitivityConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SENSITIVITY_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            timeout: Duration::from_secs(
                std::env::var("SENSITIVITY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("SENSITIVITY_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

/// HTTP client for the sensitivity-analysis service.
pub struct SensitivityClient {
    http: Client,
    config: SensitivityConfig,
}

impl SensitivityClient {
    /// Create a new client.
    pub fn new(config: SensitivityConfig) -> SensitivityResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SensitivityError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> SensitivityResult<Self> {
        Self::new(SensitivityConfig::from_env())
    }

    async fn request_analysis(&self, media_url: &str) -> SensitivityResult<SensitivityVerdict> {
        let url = format!("{}/analyze", self.config.base_url);
        let request = AnalyzeRequest {
            media_url: media_url.to_string(),
        };

        debug!("Requesting sensitivity analysis from {}", url);

        let response = self
            .with_retry(|| async {
                self.http
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(SensitivityError::Network)
            })
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SensitivityError::ServiceUnavailable(format!(
                "{}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SensitivityError::RequestFailed(format!(
                "sensitivity service returned {}: {}",
                status, body
            )));
        }

        Ok(response.json::<SensitivityVerdict>().await?)
    }

    /// Execute with limited retry on transport-level failures.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> SensitivityResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SensitivityResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Sensitivity request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| SensitivityError::RequestFailed("Unknown error".to_string())))
    }
}

impl SensitivityAnalyzer for SensitivityClient {
    async fn analyze(&self, media_url: &str) -> SensitivityResult<SensitivityVerdict> {
        self.request_analysis(media_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SensitivityClient {
        SensitivityClient::new(SensitivityConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = SensitivityConfig::default();
        assert_eq!(config.base_url, "http://localhost:8002");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_analyze_parses_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_safe": true,
                "confidence": 92,
                "labels": ["No explicit content detected"]
            })))
            .mount(&server)
            .await;

        let verdict = client_for(&server)
            .analyze("https://storage.example/v1.mp4")
            .await
            .unwrap();
        assert!(verdict.is_safe);
        assert_eq!(verdict.confidence, 92);
        assert_eq!(verdict.labels.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze("https://storage.example/v1.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, SensitivityError::ServiceUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_analyze_malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze("https://storage.example/v1.mp4")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
