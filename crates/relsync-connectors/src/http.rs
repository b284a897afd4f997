//! HTTP plumbing shared by the CMDB REST client: endpoint configuration,
//! retry with exponential backoff, and status-to-error mapping.

use relsync_core::{ApiError, ApiResult};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Connection settings for one remote CMDB instance.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL of the instance, e.g. `https://cmdb.example.com`.
    pub base_url: String,
    /// API key sent on every request.
    pub api_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry attempts after the initial request.
    pub max_retries: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// HTTP client with key auth and retry on transient failures.
pub struct HttpClient {
    client: Client,
    config: EndpointConfig,
}

impl HttpClient {
    pub fn new(config: EndpointConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Joins a path onto the base URL, normalizing slashes.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Executes a GET and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.build_url(path);
        let response = self.execute_with_retry(self.client.get(&url)).await?;
        parse_json(response).await
    }

    /// Executes a POST with a JSON body, discarding any response payload.
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<()> {
        let url = self.build_url(path);
        self.execute_with_retry(self.client.post(&url).json(body))
            .await?;
        Ok(())
    }

    /// Executes a PATCH with a JSON body, discarding any response payload.
    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<()> {
        let url = self.build_url(path);
        self.execute_with_retry(self.client.patch(&url).json(body))
            .await?;
        Ok(())
    }

    /// Executes a DELETE.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.build_url(path);
        self.execute_with_retry(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Sends a request, retrying transient failures with exponential backoff.
    ///
    /// Retried: connect failures, timeouts, 5xx, and 429 (after honoring
    /// retry-after). Client errors are mapped and returned immediately.
    async fn execute_with_retry(&self, request: reqwest::RequestBuilder) -> ApiResult<Response> {
        let request = request.header("X-Api-Key", &self.config.api_key);

        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!(attempt, ?delay, "retrying request");
                sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            let request = request
                .try_clone()
                .ok_or_else(|| ApiError::RequestFailed("request not cloneable".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(retry_after, "rate limited by the remote instance");
                        if attempt < self.config.max_retries {
                            sleep(Duration::from_secs(retry_after)).await;
                            continue;
                        }
                        return Err(ApiError::RateLimited(retry_after));
                    }

                    if status.is_server_error() && attempt < self.config.max_retries {
                        warn!(%status, "server error, retrying");
                        last_error =
                            Some(ApiError::RequestFailed(format!("Server error: {}", status)));
                        continue;
                    }

                    if status.is_client_error() || status.is_server_error() {
                        return Err(map_status(status, response).await);
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(e.to_string()));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ConnectionFailed(e.to_string()));
                    } else {
                        last_error = Some(ApiError::RequestFailed(e.to_string()));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ApiError::RequestFailed("retries exhausted".to_string())))
    }
}

async fn map_status(status: StatusCode, response: Response) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::AuthenticationFailed(status.to_string())
        }
        StatusCode::NOT_FOUND => ApiError::NotFound("resource not found".to_string()),
        StatusCode::BAD_REQUEST => {
            let body = response.text().await.unwrap_or_default();
            ApiError::RequestFailed(format!("Bad request: {}", body))
        }
        _ => ApiError::RequestFailed(format!("HTTP error: {}", status)),
    }
}

/// Reads the full body and decodes it as JSON, keeping a body prefix in the
/// error for diagnosis.
pub async fn parse_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        ApiError::InvalidResponse(format!(
            "failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}
