//! Rate-limit state reported by the API in response headers

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the remaining request quota
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the quota ceiling
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the quota reset time
pub const RESET_HEADER: &str = "x-ratelimit-reset";
/// Header carrying the server-suggested wait in seconds
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Rate-limit headers of a single response
///
/// Missing or unparsable headers fall back to a full quota (100 of 100) and
/// no suggested wait. The state is never persisted past the attempt it came
/// from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Requests left in the current window
    pub remaining: u64,
    /// Requests allowed per window
    pub limit: u64,
    /// Reset time as reported by the server
    pub reset: u64,
    /// Seconds the server asks the client to wait
    pub retry_after: u64,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: 100,
            limit: 100,
            reset: 0,
            retry_after: 0,
        }
    }
}

impl RateLimitState {
    /// Read the rate-limit headers of a response
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let defaults = Self::default();
        Self {
            remaining: header_u64(headers, REMAINING_HEADER).unwrap_or(defaults.remaining),
            limit: header_u64(headers, LIMIT_HEADER).unwrap_or(defaults.limit),
            reset: header_u64(headers, RESET_HEADER).unwrap_or(defaults.reset),
            retry_after: header_u64(headers, RETRY_AFTER_HEADER).unwrap_or(defaults.retry_after),
        }
    }

    /// The suggested wait, if the server gave a non-zero one
    pub fn retry_after_duration(&self) -> Option<Duration> {
        (self.retry_after > 0).then(|| Duration::from_secs(self.retry_after))
    }

    /// Whether 10% or less of the quota is left
    pub fn is_low(&self) -> bool {
        self.remaining.saturating_mul(10) <= self.limit
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
