//! Top-level export lifecycle: stage sequencing and terminal events

use std::time::Instant;

use crate::error::Result;
use crate::types::{Event, ExportRecord, Stage};

use super::context::ExportContext;
use super::stages;

/// Run an export to completion or first failure
///
/// Emits `ExportStarted`, then either `ExportCompleted` with the record's
/// totals or `ExportFailed` with the stage that failed. No partial record is
/// returned on failure.
pub(crate) async fn run_export(ctx: ExportContext) -> Result<ExportRecord> {
    let started = Instant::now();
    tracing::info!(export_id = ctx.id.0, scope = %ctx.scope, "Export started");
    ctx.emit(Event::ExportStarted {
        id: ctx.id,
        scope: ctx.scope,
    });

    match run_stages(&ctx).await {
        Ok(record) => {
            tracing::info!(
                export_id = ctx.id.0,
                total_items = record.total_items,
                api_calls = record.api_calls_made.total,
                requests_sent = ctx.client.requests_sent(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Export completed"
            );
            ctx.emit(Event::ExportCompleted {
                id: ctx.id,
                total_items: record.total_items,
                api_calls: record.api_calls_made.total,
            });
            Ok(record)
        }
        Err(e) => {
            tracing::error!(
                export_id = ctx.id.0,
                stage = ?e.stage(),
                error = %e,
                "Export failed"
            );
            ctx.emit(Event::ExportFailed {
                id: ctx.id,
                stage: e.stage(),
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn run_stages(ctx: &ExportContext) -> Result<ExportRecord> {
    ctx.begin(Stage::FetchUser);
    let user = stages::fetch_user(ctx)
        .await
        .map_err(|e| e.in_stage(Stage::FetchUser))?;

    ctx.begin(Stage::FetchWorkspaces);
    let workspaces = stages::fetch_workspaces(ctx)
        .await
        .map_err(|e| e.in_stage(Stage::FetchWorkspaces))?;

    ctx.begin(Stage::FetchProjects);
    let projects = stages::fetch_projects(ctx, &workspaces)
        .await
        .map_err(|e| e.in_stage(Stage::FetchProjects))?;

    ctx.begin(Stage::FetchTasks);
    let tasks = stages::fetch_tasks(ctx, &projects, &user)
        .await
        .map_err(|e| e.in_stage(Stage::FetchTasks))?;

    ctx.begin(Stage::FetchSubtasksAndStories);
    let attachments = stages::fetch_attachments(ctx, &tasks, &user)
        .await
        .map_err(|e| e.in_stage(Stage::FetchSubtasksAndStories))?;

    ctx.begin(Stage::Compile);
    Ok(stages::compile(user, workspaces, projects, tasks, attachments))
}
