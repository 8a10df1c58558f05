//! HTTP fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{CacheError, CacheResult};
use crate::fetch::Fetcher;
use crate::types::{AssetRequest, AssetResponse, Method};

/// User agent for network fetches.
pub const FETCHER_USER_AGENT: &str = concat!("sundai-cache/", env!("CARGO_PKG_VERSION"));

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fetcher for the real network.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: NetworkConfig,
}

impl HttpFetcher {
    pub fn new(config: NetworkConfig) -> CacheResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(FETCHER_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| CacheError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Create a fetcher from environment variables.
    pub fn from_env() -> CacheResult<Self> {
        Self::new(NetworkConfig::from_env())
    }

    async fn fetch_once(&self, request: &AssetRequest) -> CacheResult<AssetResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| CacheError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(AssetResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &AssetRequest) -> CacheResult<AssetResponse> {
        use rand::Rng;

        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.fetch_once(request).await {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        "network fetch"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let cap = base_backoff(retries);
                    let jittered_ms = rand::thread_rng().gen_range(0..=cap.as_millis() as u64);
                    let backoff = Duration::from_millis(jittered_ms.max(10));

                    warn!(
                        error = %e,
                        url = %request.url,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying fetch"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff before jitter, capped at [`MAX_BACKOFF`].
fn base_backoff(retries: u32) -> Duration {
    Duration::from_secs(1u64 << retries.min(5)).min(MAX_BACKOFF)
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}
