//! Test configuration helpers for loading .env credentials and creating test exporters

use std::time::Duration;

use asana_export::{Config, Exporter};
use wiremock::MockServer;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Load the Asana personal access token from the environment
///
/// Required environment variables:
/// - `ASANA_ACCESS_TOKEN` - Personal access token
///
/// Optional environment variables:
/// - `ASANA_BASE_URL` - API origin (default: the public Asana API)
pub fn load_access_token() -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();

    std::env::var("ASANA_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConfigError("ASANA_ACCESS_TOKEN not set in environment".to_string()))
}

/// Check if live credentials are available
pub fn has_live_credentials() -> bool {
    load_access_token().is_ok()
}

/// Create an Exporter configured for the live API
pub fn create_live_exporter() -> Result<Exporter, ConfigError> {
    dotenvy::dotenv().ok();

    let mut config = Config::default();
    if let Ok(base_url) = std::env::var("ASANA_BASE_URL") {
        config.api.base_url = base_url;
    }

    Exporter::new(config).map_err(|e| ConfigError(e.to_string()))
}

/// Config pointing at a mock server, with short delays
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.retry.base_delay = Duration::from_millis(10);
    config.batch.inter_chunk_delay = Duration::from_millis(1);
    config
}

/// Install a tracing subscriber honoring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Skip test if credentials are not available
#[macro_export]
macro_rules! skip_if_no_credentials {
    () => {
        if !$crate::common::has_live_credentials() {
            eprintln!("Skipping test: ASANA_ACCESS_TOKEN not found in .env");
            return;
        }
    };
}
