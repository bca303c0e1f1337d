//! The six export stages
//!
//! Each stage takes the results of the previous ones and returns its own.
//! Errors carry resource context from the client; the orchestration adds
//! the stage.

use chrono::Utc;

use crate::batch::{chunk_count, fetch_for_many, fetch_for_many_chunked};
use crate::error::Result;
use crate::filter::filter;
use crate::models::{Project, Story, Subtask, Task, User, Workspace};
use crate::types::{ApiCallSummary, ExportRecord, Stage};

use super::context::ExportContext;

/// Output of the subtask and story stage
pub(crate) struct Attachments {
    pub(crate) subtasks: Vec<Subtask>,
    pub(crate) stories: Vec<Story>,
    pub(crate) subtask_batches: usize,
    pub(crate) story_batches: usize,
}

/// Stage 1
pub(crate) async fn fetch_user(ctx: &ExportContext) -> Result<User> {
    let user = ctx.client.current_user().await?;
    tracing::debug!(export_id = ctx.id.0, user = %user.gid, "Fetched user");
    Ok(user)
}

/// Stage 2
pub(crate) async fn fetch_workspaces(ctx: &ExportContext) -> Result<Vec<Workspace>> {
    let workspaces = ctx.client.workspaces().await?;
    tracing::debug!(export_id = ctx.id.0, count = workspaces.len(), "Fetched workspaces");
    Ok(workspaces)
}

/// Stage 3: projects of every workspace, fetched concurrently
pub(crate) async fn fetch_projects(
    ctx: &ExportContext,
    workspaces: &[Workspace],
) -> Result<Vec<Project>> {
    let ids: Vec<String> = workspaces.iter().map(|w| w.gid.clone()).collect();
    let per_workspace =
        fetch_for_many(&ids, |gid| async move { ctx.client.projects(&gid).await }).await?;

    let projects: Vec<Project> = per_workspace
        .into_iter()
        .flat_map(|(_, projects)| projects)
        .collect();
    tracing::debug!(export_id = ctx.id.0, count = projects.len(), "Fetched projects");
    Ok(projects)
}

/// Stage 4: tasks of every project, fetched concurrently, then scope-filtered
pub(crate) async fn fetch_tasks(
    ctx: &ExportContext,
    projects: &[Project],
    user: &User,
) -> Result<Vec<Task>> {
    let ids: Vec<String> = projects.iter().map(|p| p.gid.clone()).collect();
    let per_project =
        fetch_for_many(&ids, |gid| async move { ctx.client.tasks(&gid).await }).await?;

    // Results come back in input order, so they line up with `projects`
    let all_tasks: Vec<Task> = projects
        .iter()
        .zip(per_project)
        .flat_map(|(project, (_, tasks))| tasks.into_iter().map(move |t| t.in_project(project)))
        .collect();

    let total = all_tasks.len();
    let tasks = filter(all_tasks, user, ctx.scope);
    tracing::info!(
        export_id = ctx.id.0,
        scope = %ctx.scope,
        kept = tasks.len(),
        total,
        "Applied export scope"
    );
    ctx.report(Stage::FetchTasks, ctx.scope.summary_message(tasks.len(), total));
    Ok(tasks)
}

/// Stage 5: subtasks and stories of the selected tasks, in chunks
///
/// Tasks with subtasks drive the subtask fetch. Tasks with subtasks or with
/// stories in their list payload drive the story fetch. Subtasks are
/// filtered only for `completed-assigned`; stories never are.
pub(crate) async fn fetch_attachments(
    ctx: &ExportContext,
    tasks: &[Task],
    user: &User,
) -> Result<Attachments> {
    let stage = Stage::FetchSubtasksAndStories;
    let batch = &ctx.config.batch;

    let with_subtasks: Vec<String> = tasks
        .iter()
        .filter(|t| t.has_subtasks())
        .map(|t| t.gid.clone())
        .collect();
    let with_stories: Vec<String> = tasks
        .iter()
        .filter(|t| t.has_subtasks() || t.has_stories())
        .map(|t| t.gid.clone())
        .collect();

    let subtask_batches = chunk_count(with_subtasks.len(), batch.chunk_size);
    let fetched = fetch_for_many_chunked(
        &with_subtasks,
        |gid| async move { ctx.client.subtasks(&gid).await },
        batch,
        |chunk| {
            ctx.report(
                stage,
                format!("Processing subtasks batch {}/{}...", chunk.index, chunk.total),
            )
        },
    )
    .await?;
    let all_subtasks: Vec<Subtask> = fetched.into_iter().flat_map(|(_, s)| s).collect();

    let subtasks = if ctx.scope.filters_subtasks() {
        let total = all_subtasks.len();
        let kept = filter(all_subtasks, user, ctx.scope);
        ctx.report(
            stage,
            format!(
                "Found {} completed subtasks assigned to you out of {} total subtasks",
                kept.len(),
                total
            ),
        );
        kept
    } else {
        all_subtasks
    };

    let story_batches = chunk_count(with_stories.len(), batch.chunk_size);
    let fetched = fetch_for_many_chunked(
        &with_stories,
        |gid| async move { ctx.client.stories(&gid).await },
        batch,
        |chunk| {
            ctx.report(
                stage,
                format!("Processing stories batch {}/{}...", chunk.index, chunk.total),
            )
        },
    )
    .await?;
    let stories: Vec<Story> = fetched.into_iter().flat_map(|(_, s)| s).collect();

    tracing::debug!(
        export_id = ctx.id.0,
        subtasks = subtasks.len(),
        stories = stories.len(),
        subtask_batches,
        story_batches,
        "Fetched subtasks and stories"
    );

    Ok(Attachments {
        subtasks,
        stories,
        subtask_batches,
        story_batches,
    })
}

/// Stage 6: assemble the record
pub(crate) fn compile(
    user: User,
    workspaces: Vec<Workspace>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    attachments: Attachments,
) -> ExportRecord {
    let api_calls_made = ApiCallSummary::new(
        workspaces.len(),
        projects.len(),
        attachments.subtask_batches,
        attachments.story_batches,
    );

    ExportRecord {
        total_items: tasks.len() + attachments.subtasks.len(),
        user,
        workspaces,
        projects,
        tasks,
        subtasks: attachments.subtasks,
        stories: attachments.stories,
        export_timestamp: Utc::now(),
        api_calls_made,
    }
}
