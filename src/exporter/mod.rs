//! Export orchestration split into focused submodules:
//! - [`context`] - Per-export state and progress reporting
//! - [`stages`] - The six stages, user through compile
//! - [`orchestration`] - Stage sequencing and terminal events

mod context;
mod orchestration;
mod stages;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, mpsc};

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::filter::ExportScope;
use crate::models::Task;
use crate::types::{Event, ExportId, ExportRecord};

use context::{ExportContext, ProgressUpdate};

/// Entry point for running exports (cloneable; clones share the event channel)
///
/// An `Exporter` holds configuration and an event channel but no
/// credentials. Every export call binds its own token to a fresh client,
/// throttle gate and retry policy, so concurrent exports with different
/// tokens never share state.
#[derive(Clone)]
pub struct Exporter {
    /// Configuration shared by every export
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    next_id: Arc<AtomicU64>,
}

impl Exporter {
    /// Create an exporter after validating `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(config.progress.channel_capacity);
        Ok(Self {
            config: Arc::new(config),
            event_tx,
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The configuration exports run with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to events of every export run by this exporter
    ///
    /// Receivers that fall behind by more than `progress.channel_capacity`
    /// events lose the oldest ones; the export itself never waits.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Export everything `scope` selects for the owner of `token`
    pub async fn export(&self, token: &str, scope: ExportScope) -> Result<ExportRecord> {
        let ctx = self.context(token, scope)?;
        orchestration::run_export(ctx).await
    }

    /// Like [`export`](Self::export), also calling `on_progress(current, total, message)`
    ///
    /// The callback runs on a separate task fed by an unbounded channel, so a
    /// slow callback never stalls fetching. Every update is delivered before
    /// this method returns.
    pub async fn export_with_progress<F>(
        &self,
        token: &str,
        scope: ExportScope,
        mut on_progress: F,
    ) -> Result<ExportRecord>
    where
        F: FnMut(u8, u8, &str) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
        let ctx = self.context(token, scope)?.with_progress_channel(tx);

        let forwarder = tokio::spawn(async move {
            while let Some((current, total, message)) = rx.recv().await {
                on_progress(current, total, &message);
            }
        });

        // Dropping the context inside run_export closes the channel
        let result = orchestration::run_export(ctx).await;

        if let Err(e) = forwarder.await {
            tracing::warn!(error = %e, "Progress callback task failed");
        }
        result
    }

    /// Look up tasks by gid for the owner of `token`, in the order given
    ///
    /// All lookups run concurrently under one throttle gate; the first
    /// failure fails the whole call.
    pub async fn fetch_tasks_by_id(&self, token: &str, task_gids: &[String]) -> Result<Vec<Task>> {
        let client = ApiClient::from_config(&self.config, token)?;
        client.tasks_by_id(task_gids).await
    }

    fn context(&self, token: &str, scope: ExportScope) -> Result<ExportContext> {
        let client = ApiClient::from_config(&self.config, token)?;
        let id = ExportId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(ExportContext::new(
            id,
            client,
            Arc::clone(&self.config),
            scope,
            self.event_tx.clone(),
        ))
    }
}
