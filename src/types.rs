//! Core types for pixfetch

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Sequence number identifying one pipeline run
///
/// Run ids are handed out in strictly increasing order by a single
/// [`Pipeline`](crate::Pipeline), so a larger id always means a later start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    /// Create a new RunId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a request may be answered from the local response cache
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Serve from the local cache when a response for the URL is stored
    UseCache,
    /// Always perform a network round trip and ask intermediaries not to cache
    #[default]
    BypassCache,
}

/// A single image retrieval
///
/// Immutable once created; the `with_*` methods return a modified copy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    url: Url,
    cache_policy: CachePolicy,
    timeout: Duration,
}

impl FetchRequest {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a request for `url` with the default timeout and [`CachePolicy::BypassCache`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if `url` does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixfetch::{CachePolicy, FetchRequest};
    /// use std::time::Duration;
    ///
    /// let request = FetchRequest::new("http://example.com/scream.jpg")?
    ///     .with_cache_policy(CachePolicy::UseCache)
    ///     .with_timeout(Duration::from_secs(3));
    /// assert_eq!(request.timeout(), Duration::from_secs(3));
    /// # Ok::<(), pixfetch::Error>(())
    /// ```
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self::from_url(Url::parse(url)?))
    }

    /// Create a request from an already parsed URL
    pub fn from_url(url: Url) -> Self {
        Self {
            url,
            cache_policy: CachePolicy::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Copy of this request with a different cache policy
    #[must_use]
    pub fn with_cache_policy(&self, cache_policy: CachePolicy) -> Self {
        Self {
            cache_policy,
            ..self.clone()
        }
    }

    /// Copy of this request with a different timeout
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Cache policy
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    /// Maximum time the retrieval may take
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A decoded image, stored as tightly packed RGBA8 rows
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixel data, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl Image {
    /// `(width, height)` in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// How a unit of work is scheduled and how its result is delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Run on the caller's context; completion fires before `run` returns
    Blocking,
    /// Run on one dedicated background worker, in submission order
    BackgroundSingle,
    /// Run on any worker of a concurrent pool, in no particular order
    BackgroundPool,
    /// Run as a sequential chain, each stage after the previous completion
    PromiseChain,
}

impl std::fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConcurrencyMode::Blocking => "blocking",
            ConcurrencyMode::BackgroundSingle => "background_single",
            ConcurrencyMode::BackgroundPool => "background_pool",
            ConcurrencyMode::PromiseChain => "promise_chain",
        };
        f.write_str(name)
    }
}

/// Event emitted during a run's lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run was started and its target cleared
    RunStarted {
        /// Run ID
        run: RunId,
        /// Display target name
        target: String,
        /// Requested URL (first URL for a sequence)
        url: String,
        /// Scheduling strategy
        mode: ConcurrencyMode,
    },

    /// A decoded image was assigned to the target
    Displayed {
        /// Run ID
        run: RunId,
        /// Display target name
        target: String,
        /// Image width in pixels
        width: u32,
        /// Image height in pixels
        height: u32,
    },

    /// Retrieval failed or the run was refused; the target was left blank
    FetchFailed {
        /// Run ID
        run: RunId,
        /// Display target name
        target: String,
        /// Error message
        error: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },

    /// Retrieved bytes could not be decoded; the target was left unchanged
    DecodeFailed {
        /// Run ID
        run: RunId,
        /// Display target name
        target: String,
        /// Error message
        error: String,
    },

    /// A result arrived for a run that is no longer the target's latest and was dropped
    Superseded {
        /// Run ID of the dropped result
        run: RunId,
        /// Display target name
        target: String,
        /// Run ID currently owning the target
        latest: RunId,
    },

    /// One stage of a sequence finished and was delivered
    StageCompleted {
        /// Run ID
        run: RunId,
        /// Zero-based stage index
        stage: usize,
    },

    /// A sequence stopped at a failing stage
    ChainFailed {
        /// Run ID
        run: RunId,
        /// Zero-based index of the failing stage
        stage: usize,
        /// Error message
        error: String,
    },

    /// Every stage of a sequence completed
    ChainFinished {
        /// Run ID
        run: RunId,
        /// Number of stages run
        stages: usize,
    },
}
