//! HTTP client for the device-status service.
//!
//! Queries `GET /gpus`, `GET /gpus/optimal` and `GET /models`, attaching the
//! bearer token from a [`CredentialStore`] to every request.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gpuwatch::{ServiceClient, SnapshotFetcher};
//!
//! # tokio_test::block_on(async {
//! let client = ServiceClient::builder()
//!     .base_url("http://localhost:8000")
//!     .token("secret")
//!     .build()
//!     .unwrap();
//!
//! let gpus = client.fetch().await.unwrap();
//! println!("{} devices", gpus.len());
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gpuwatch_types::{DeviceSnapshot, ModelRecord, Recommendation, RecommendationResponse};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use super::credentials::{CredentialStore, TokenStore};
use super::{FetchError, ModelSource, RecommendationSource, SnapshotFetcher};

/// Default base URL of the device service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client for the device-status service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    min_free_memory_mb: Option<u64>,
    description: String,
}

impl ServiceClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential store consulted for every request.
    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode a JSON body, mapping failures to [`FetchError`].
    ///
    /// A 401 invalidates the credential store before returning [`FetchError::Auth`].
    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        let response = request.send().await?;
        let response = self.check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn check_status(&self, response: Response) -> Result<Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_detail(response).await;

        if status == StatusCode::UNAUTHORIZED {
            warn!("device service rejected credentials, invalidating session");
            self.credentials.invalidate();
            return Err(FetchError::Auth(detail));
        }

        Err(FetchError::Service {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl SnapshotFetcher for ServiceClient {
    async fn fetch(&self) -> Result<Vec<DeviceSnapshot>, FetchError> {
        self.get_json(self.get("/gpus")).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[async_trait]
impl RecommendationSource for ServiceClient {
    async fn recommend(&self) -> Result<Recommendation, FetchError> {
        let mut request = self.get("/gpus/optimal");
        if let Some(min) = self.min_free_memory_mb {
            request = request.query(&[("min_memory_mb", min)]);
        }

        let response: RecommendationResponse = self.get_json(request).await?;
        response
            .into_recommendation()
            .ok_or_else(|| FetchError::Decode("found=true without gpu_index".to_string()))
    }
}

#[async_trait]
impl ModelSource for ServiceClient {
    async fn models(&self) -> Result<Vec<ModelRecord>, FetchError> {
        self.get_json(self.get("/models")).await
    }
}

/// Error body shape used by the service (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Extract a human-readable explanation from a failure response.
///
/// Falls back to the status reason when the body has no `detail` field.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string();

    let Ok(body) = response.text().await else {
        return fallback;
    };

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() && body.len() <= 200 => body.trim().to_string(),
        Err(_) => fallback,
    }
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Default)]
pub struct ServiceClientBuilder {
    base_url: Option<String>,
    credentials: Option<Arc<dyn CredentialStore>>,
    timeout: Option<Duration>,
    min_free_memory_mb: Option<u64>,
}

impl ServiceClientBuilder {
    /// Set the service base URL (default: "http://localhost:8000").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a fixed bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Arc::new(TokenStore::new(Some(token.into()))));
        self
    }

    /// Use an externally owned credential store.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the per-request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Minimum free memory forwarded to the optimal-device query.
    pub fn min_free_memory_mb(mut self, min: Option<u64>) -> Self {
        self.min_free_memory_mb = min;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ServiceClient, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ServiceClient {
            client,
            description: format!("http: {}", base_url),
            base_url,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(TokenStore::default())),
            min_free_memory_mb: self.min_free_memory_mb,
        })
    }
}
