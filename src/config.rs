//! Configuration types for pixfetch

use crate::error::{Error, Result};
use crate::types::CachePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Network retrieval settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout applied to requests built by the pipeline (default: 10 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub default_timeout: Duration,

    /// TCP connect timeout for the HTTP client (default: 5 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Cache policy applied to requests built by the pipeline (default: bypass)
    #[serde(default)]
    pub default_cache_policy: CachePolicy,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of responses kept in the in-memory cache (default: 32, 0 disables caching)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            default_cache_policy: CachePolicy::default(),
            user_agent: default_user_agent(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Background execution settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of workers in the concurrent pool (default: 4, minimum: 2)
    #[serde(default = "default_pool_workers")]
    pub pool_workers: usize,

    /// Pause between consecutive stages of a promise chain (default: 0)
    #[serde(default, with = "duration_serde")]
    pub chain_stage_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_workers: default_pool_workers(),
            chain_stage_delay: Duration::ZERO,
        }
    }
}

/// How completions of superseded runs are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupersedePolicy {
    /// Drop results of runs that are no longer the latest for their target
    #[default]
    KeepLatest,
    /// Drop stale results and cancel the superseded run's in-flight work
    CancelPrevious,
    /// Apply every result as it arrives; the last completion wins
    LastCompletes,
}

/// Display and delivery settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Treatment of results from superseded runs (default: keep latest)
    #[serde(default)]
    pub supersede: SupersedePolicy,

    /// Reject decoded images wider or taller than this many pixels (None = no limit)
    #[serde(default)]
    pub max_dimension: Option<u32>,

    /// Capacity of the event broadcast channel (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            supersede: SupersedePolicy::default(),
            max_dimension: None,
            event_capacity: default_event_capacity(),
        }
    }
}

/// Main configuration for [`Pipeline`](crate::Pipeline)
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network retrieval settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Background execution settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Display and delivery settings
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Parse a configuration from a JSON string and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that all settings are usable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.pool_workers < 2 {
            return Err(Error::config(
                "pool_workers",
                format!(
                    "pool needs at least 2 workers, got {}",
                    self.dispatch.pool_workers
                ),
            ));
        }
        if self.fetch.default_timeout.is_zero() {
            return Err(Error::config(
                "default_timeout",
                "timeout must be greater than zero",
            ));
        }
        if self.display.event_capacity == 0 {
            return Err(Error::config(
                "event_capacity",
                "event channel capacity must be greater than zero",
            ));
        }
        if self.display.max_dimension == Some(0) {
            return Err(Error::config(
                "max_dimension",
                "dimension limit must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_cache_capacity() -> usize {
    32
}

fn default_pool_workers() -> usize {
    4
}

fn default_event_capacity() -> usize {
    256
}

// Duration serialization helper (seconds, fractional values allowed)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}
