//! Per-export state: the bound client, the scope and progress reporting

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::client::ApiClient;
use crate::config::Config;
use crate::filter::ExportScope;
use crate::types::{Event, ExportId, Stage, TOTAL_STAGES};

/// `(current, total, message)` as handed to a progress callback
pub(crate) type ProgressUpdate = (u8, u8, String);

/// Everything one export run needs
///
/// Built fresh for every export; nothing in it is shared with other runs
/// except the event sender.
pub(crate) struct ExportContext {
    pub(crate) id: ExportId,
    pub(crate) client: ApiClient,
    pub(crate) config: Arc<Config>,
    pub(crate) scope: ExportScope,
    event_tx: broadcast::Sender<Event>,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ExportContext {
    pub(crate) fn new(
        id: ExportId,
        client: ApiClient,
        config: Arc<Config>,
        scope: ExportScope,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            id,
            client,
            config,
            scope,
            event_tx,
            progress_tx: None,
        }
    }

    /// Also deliver progress updates to `tx`
    pub(crate) fn with_progress_channel(mut self, tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Announce the start of `stage`
    pub(crate) fn begin(&self, stage: Stage) {
        tracing::info!(export_id = self.id.0, stage = %stage, "{}", stage.start_message());
        self.report(stage, stage.start_message());
    }

    /// Send a progress update for `stage`
    ///
    /// Never blocks: a lagging subscriber loses old events, and the callback
    /// channel is unbounded.
    pub(crate) fn report(&self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(export_id = self.id.0, current = stage.index(), %message, "Progress");

        if let Some(tx) = &self.progress_tx {
            tx.send((stage.index(), TOTAL_STAGES, message.clone())).ok();
        }
        self.emit(Event::Progress {
            id: self.id,
            current: stage.index(),
            total: TOTAL_STAGES,
            message,
        });
    }

    /// Broadcast an event; having no subscribers is not an error
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
