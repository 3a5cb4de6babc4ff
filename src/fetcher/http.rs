//! HTTP fetcher built on reqwest

use super::{FetchResult, Fetcher, ResponseCache};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::types::{CachePolicy, FetchRequest};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};

/// [`Fetcher`] performing plain HTTP(S) GET requests
///
/// Successful responses are stored in a bounded in-memory cache. Requests with
/// [`CachePolicy::UseCache`] are answered from it when possible; requests with
/// [`CachePolicy::BypassCache`] always reach the server, carry `no-cache`
/// directives, and refresh the cached copy.
pub struct HttpFetcher {
    client: reqwest::Client,
    cache: ResponseCache,
}

impl HttpFetcher {
    /// Build a fetcher from the fetch settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) if the HTTP client cannot be constructed.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            cache: ResponseCache::new(config.cache_capacity),
        })
    }

    /// Drop every cached response
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        tracing::debug!("response cache cleared");
    }

    /// Number of responses currently cached
    pub async fn cached_responses(&self) -> usize {
        self.cache.len().await
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let url = request.url().as_str();
        let timeout = request.timeout();

        if request.cache_policy() == CachePolicy::UseCache
            && let Some(body) = self.cache.get(url).await
        {
            tracing::debug!(url, bytes = body.len(), "served from response cache");
            return Ok(body);
        }

        let mut builder = self.client.get(request.url().clone()).timeout(timeout);
        if request.cache_policy() == CachePolicy::BypassCache {
            builder = builder
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        tracing::debug!(url, policy = ?request.cache_policy(), "sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, e))?;

        tracing::debug!(url, bytes = body.len(), "request completed");
        self.cache.insert(url.to_string(), body.clone()).await;
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
