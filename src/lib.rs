//! # asana-export
//!
//! Rate-limited batch export of a user's Asana data: workspaces, projects,
//! tasks, subtasks and stories, gathered into one [`ExportRecord`].
//!
//! ## Design Philosophy
//!
//! asana-export is designed to be:
//! - **Rate-limit safe** - Requests go through a FIFO throttle gate and
//!   rate-limited calls are retried with exponential backoff
//! - **Sensible defaults** - Works out of the box against the public API
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use asana_export::{Config, ExportScope, Exporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Exporter::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let token = std::env::var("ASANA_ACCESS_TOKEN")?;
//!     let record = exporter.export(&token, ExportScope::AssignedOnly).await?;
//!     record.write_json("asana_export.json")?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Concurrent fan-out over task ids
pub mod batch;
/// Asana REST API client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export orchestration
pub mod exporter;
/// Export scope and task filtering
pub mod filter;
/// Typed API resources
pub mod models;
/// Retry logic with exponential backoff
pub mod retry;
/// Cap on concurrent in-flight requests
pub mod throttle;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use client::ApiClient;
pub use client::rate_limit::RateLimitState;
pub use config::{ApiConfig, BatchConfig, Config, ProgressConfig, RetryConfig, ThrottleConfig};
pub use error::{ApiError, Error, Result};
pub use exporter::Exporter;
pub use filter::ExportScope;
pub use models::{Project, Reference, Story, Subtask, Task, User, Workspace};
pub use retry::{IsRetryable, RetryPolicy};
pub use throttle::{Permit, ThrottleGate};
pub use types::{ApiCallSummary, Event, ExportId, ExportRecord, Stage};
