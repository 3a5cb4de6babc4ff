//! Network retrieval
//!
//! The core abstraction is the [`Fetcher`] trait. [`HttpFetcher`] is the
//! production implementation; tests and embedders can supply their own.
//!
//! Whatever the implementation, [`fetch_with_timeout`] is what the pipeline
//! calls, so a request's timeout is enforced even for fetchers that ignore it.
//!
//! ## Usage
//!
//! ```no_run
//! use pixfetch::config::FetchConfig;
//! use pixfetch::fetcher::{HttpFetcher, fetch_with_timeout};
//! use pixfetch::FetchRequest;
//!
//! # async fn example() -> pixfetch::Result<()> {
//! let fetcher = HttpFetcher::new(&FetchConfig::default())?;
//! let request = FetchRequest::new("http://www.ibiblio.org/wm/paint/auth/munch/munch.scream.jpg")?;
//! let bytes = fetch_with_timeout(&fetcher, &request).await?;
//! println!("fetched {} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

mod cache;
mod http;

pub use cache::ResponseCache;
pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::FetchRequest;
use async_trait::async_trait;
use bytes::Bytes;

/// Outcome of a single retrieval: the response body or the reason it failed
pub type FetchResult = std::result::Result<Bytes, FetchError>;

/// Performs network retrievals
///
/// Implementations must honor the request's [`CachePolicy`](crate::CachePolicy):
/// `BypassCache` always goes to the network. They perform I/O only and never
/// touch display state.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the bytes for `request`
    async fn fetch(&self, request: &FetchRequest) -> FetchResult;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Run `fetcher` for `request`, failing with [`FetchError::Timeout`] once the
/// request's timeout elapses
pub async fn fetch_with_timeout(fetcher: &dyn Fetcher, request: &FetchRequest) -> FetchResult {
    match tokio::time::timeout(request.timeout(), fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(
                url = %request.url(),
                timeout_ms = request.timeout().as_millis(),
                fetcher = fetcher.name(),
                "fetch exceeded its timeout"
            );
            Err(FetchError::Timeout {
                url: request.url().to_string(),
                timeout: request.timeout(),
            })
        }
    }
}
