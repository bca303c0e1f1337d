//! Configuration types for asana-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default origin of the Asana REST API
pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Largest page size the API accepts for list endpoints
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Upstream API connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API origin (default: "https://app.asana.com/api/1.0")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// `limit` query parameter sent on list endpoints (default: 100, max: 100)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            page_limit: default_page_limit(),
        }
    }
}

/// Throttle gate settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum number of requests in flight at once (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Retry behavior for rate-limited (HTTP 429) responses
///
/// The delay before retry `n` (zero-based) is
/// `max(base_delay * 2^n, retry-after)`, optionally capped by `max_delay`.
/// The server's `retry-after` always wins over the cap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 5)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (default: 2 seconds)
    #[serde(default = "default_base_delay", with = "duration_ms_serde")]
    pub base_delay: Duration,

    /// Upper bound on the exponential part of the delay (default: none)
    #[serde(default, with = "optional_duration_ms_serde")]
    pub max_delay: Option<Duration>,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: None,
            jitter: false,
        }
    }
}

/// Chunking for the subtask and story fan-out
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of task ids fetched concurrently per chunk (default: 10)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Cool-down between consecutive chunks (default: 200 ms)
    #[serde(default = "default_inter_chunk_delay", with = "duration_ms_serde")]
    pub inter_chunk_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            inter_chunk_delay: default_inter_chunk_delay(),
        }
    }
}

/// Progress event delivery
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Capacity of the event broadcast channel (default: 256)
    ///
    /// Subscribers that fall further behind than this lose the oldest events.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Main configuration for [`Exporter`](crate::Exporter)
///
/// Every field has a sensible default, so `Config::default()` talks to the
/// public Asana API with the documented rate-limit behavior.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Concurrency cap on outbound requests
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Chunked fan-out settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Progress event delivery
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Config {
    /// Check the configuration for values the exporter cannot run with
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::Config {
                message: format!("invalid base URL '{}'", self.api.base_url),
                key: Some("api.base_url".to_string()),
            });
        }
        if self.api.page_limit == 0 || self.api.page_limit > MAX_PAGE_LIMIT {
            return Err(Error::Config {
                message: format!(
                    "page limit must be between 1 and {}, got {}",
                    MAX_PAGE_LIMIT, self.api.page_limit
                ),
                key: Some("api.page_limit".to_string()),
            });
        }
        if self.throttle.max_concurrent == 0 {
            return Err(Error::Config {
                message: "max_concurrent must be at least 1".to_string(),
                key: Some("throttle.max_concurrent".to_string()),
            });
        }
        if self.batch.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1".to_string(),
                key: Some("batch.chunk_size".to_string()),
            });
        }
        if self.progress.channel_capacity == 0 {
            return Err(Error::Config {
                message: "channel_capacity must be at least 1".to_string(),
                key: Some("progress.channel_capacity".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_chunk_size() -> usize {
    10
}

fn default_inter_chunk_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_channel_capacity() -> usize {
    256
}

// Duration serialization helper (integer milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
