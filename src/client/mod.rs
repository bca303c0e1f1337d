//! Asana REST API client
//!
//! An [`ApiClient`] is bound to exactly one access token, one
//! [`ThrottleGate`] and one [`RetryPolicy`]. Nothing is configured
//! process-wide, so clients built from different tokens never share state.
//!
//! - [`rate_limit`] - Rate-limit headers of a response
//! - [`pagination`] - Response envelopes and the paginated fetcher
//! - [`endpoints`] - Typed calls for the resources an export walks

pub mod endpoints;
pub mod pagination;
pub mod rate_limit;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::{ApiConfig, Config};
use crate::error::{ApiError, Error, Result};
use crate::retry::RetryPolicy;
use crate::throttle::ThrottleGate;
use rate_limit::RateLimitState;

/// Longest response body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Query parameters of a request
pub type Query<'a> = [(&'a str, String)];

/// Client for one access token
///
/// Cloning is cheap; clones share the HTTP connection pool, the throttle gate
/// and the request counter.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    page_limit: u32,
    retry: RetryPolicy,
    requests_sent: Arc<AtomicUsize>,
}

impl ApiClient {
    /// Create a client sending `token` as bearer credential on every request
    ///
    /// Fails with [`Error::Config`] if the token is empty or not a valid
    /// header value.
    pub fn new(config: &ApiConfig, token: &str, retry: RetryPolicy) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Config {
                message: "access token must not be empty".to_string(),
                key: Some("access_token".to_string()),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            Error::Config {
                message: "access token contains characters not allowed in a header".to_string(),
                key: Some("access_token".to_string()),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_limit: config.page_limit,
            retry,
            requests_sent: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a client with a fresh throttle gate and retry policy from `config`
    pub fn from_config(config: &Config, token: &str) -> Result<Self> {
        let gate = ThrottleGate::new(config.throttle.max_concurrent);
        let retry = RetryPolicy::new(config.retry.clone(), gate);
        Self::new(&config.api, token, retry)
    }

    /// The throttle gate every request of this client goes through
    pub fn gate(&self) -> &ThrottleGate {
        self.retry.gate()
    }

    /// Number of HTTP requests sent so far, retries included
    pub fn requests_sent(&self) -> usize {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// GET `path` and decode the JSON body, retrying rate-limited attempts
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query<'_>,
    ) -> std::result::Result<T, ApiError> {
        self.retry.execute(|| self.send_once(path, query)).await
    }

    /// Perform exactly one GET request
    async fn send_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query<'_>,
    ) -> std::result::Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let rate_limit = RateLimitState::from_headers(response.headers());
        if rate_limit.is_low() {
            tracing::debug!(
                path,
                remaining = rate_limit.remaining,
                limit = rate_limit.limit,
                "Rate-limit quota running low"
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                path: path.to_string(),
                rate_limit,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let bytes = response.bytes().await.map_err(|source| ApiError::Network {
            path: path.to_string(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn truncate_body(body: String) -> String {
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}... (truncated)", truncated)
    } else {
        body
    }
}
