//! Core types for asana-export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::filter::ExportScope;
use crate::models::{Project, Story, Subtask, Task, User, Workspace};

/// Number of stages in an export run
pub const TOTAL_STAGES: u8 = 6;

/// Export stage, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Look up the user owning the access token
    FetchUser,
    /// List workspaces
    FetchWorkspaces,
    /// List projects of every workspace
    FetchProjects,
    /// List tasks of every project and apply the export scope
    FetchTasks,
    /// Fetch subtasks and stories in chunks
    FetchSubtasksAndStories,
    /// Assemble the export record
    Compile,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; TOTAL_STAGES as usize] = [
        Stage::FetchUser,
        Stage::FetchWorkspaces,
        Stage::FetchProjects,
        Stage::FetchTasks,
        Stage::FetchSubtasksAndStories,
        Stage::Compile,
    ];

    /// One-based position of this stage (1..=6)
    pub fn index(self) -> u8 {
        match self {
            Stage::FetchUser => 1,
            Stage::FetchWorkspaces => 2,
            Stage::FetchProjects => 3,
            Stage::FetchTasks => 4,
            Stage::FetchSubtasksAndStories => 5,
            Stage::Compile => 6,
        }
    }

    /// Progress message announcing the stage
    pub fn start_message(self) -> &'static str {
        match self {
            Stage::FetchUser => "Fetching user information...",
            Stage::FetchWorkspaces => "Fetching workspaces...",
            Stage::FetchProjects => "Fetching projects from all workspaces...",
            Stage::FetchTasks => "Fetching tasks from all projects...",
            Stage::FetchSubtasksAndStories => "Processing subtasks and comments...",
            Stage::Compile => "Compiling export data...",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::FetchUser => "fetching user",
            Stage::FetchWorkspaces => "fetching workspaces",
            Stage::FetchProjects => "fetching projects",
            Stage::FetchTasks => "fetching tasks",
            Stage::FetchSubtasksAndStories => "fetching subtasks and stories",
            Stage::Compile => "compiling",
        };
        f.write_str(name)
    }
}

/// Identifier of one export run within an [`Exporter`](crate::Exporter)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(pub u64);

impl ExportId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ExportId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event emitted during an export run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An export run started
    ExportStarted {
        /// Export ID
        id: ExportId,
        /// Requested scope
        scope: ExportScope,
    },

    /// Progress within the running export
    Progress {
        /// Export ID
        id: ExportId,
        /// One-based index of the running stage
        current: u8,
        /// Total number of stages
        total: u8,
        /// Human-readable status
        message: String,
    },

    /// The export finished and produced a record
    ExportCompleted {
        /// Export ID
        id: ExportId,
        /// Tasks plus subtasks in the record
        total_items: usize,
        /// Total API calls accounted for
        api_calls: usize,
    },

    /// The export aborted; no record was produced
    ExportFailed {
        /// Export ID
        id: ExportId,
        /// Stage that was running, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
        /// Error message
        error: String,
    },
}

impl Event {
    /// The export this event belongs to
    pub fn export_id(&self) -> ExportId {
        match self {
            Event::ExportStarted { id, .. }
            | Event::Progress { id, .. }
            | Event::ExportCompleted { id, .. }
            | Event::ExportFailed { id, .. } => *id,
        }
    }
}

/// API call accounting for one export
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCallSummary {
    /// User lookup (always 1)
    pub user_info: usize,
    /// Workspace listing (always 1)
    pub workspaces: usize,
    /// One project listing per workspace
    pub projects: usize,
    /// One task listing per project
    pub tasks: usize,
    /// Number of subtask chunks
    pub subtasks_batches: usize,
    /// Number of story chunks
    pub stories_batches: usize,
    /// `3 + workspaces + projects + subtask chunks + story chunks`
    pub total: usize,
}

impl ApiCallSummary {
    /// Build the summary from the counts gathered during an export
    ///
    /// The constant 3 covers the user lookup, the workspace listing and the
    /// base call.
    pub fn new(
        workspace_count: usize,
        project_count: usize,
        subtask_batches: usize,
        story_batches: usize,
    ) -> Self {
        Self {
            user_info: 1,
            workspaces: 1,
            projects: workspace_count,
            tasks: project_count,
            subtasks_batches: subtask_batches,
            stories_batches: story_batches,
            total: 3 + workspace_count + project_count + subtask_batches + story_batches,
        }
    }
}

/// The result of a successful export
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// The user owning the access token
    pub user: User,
    /// Every workspace visible to the user
    pub workspaces: Vec<Workspace>,
    /// Every project in those workspaces
    pub projects: Vec<Project>,
    /// Tasks selected by the export scope
    pub tasks: Vec<Task>,
    /// Subtasks of the selected tasks (scope-filtered for `completed-assigned` only)
    pub subtasks: Vec<Subtask>,
    /// Every story fetched for the selected tasks, unfiltered
    pub stories: Vec<Story>,
    /// When the export was compiled
    pub export_timestamp: DateTime<Utc>,
    /// `tasks.len() + subtasks.len()`
    pub total_items: usize,
    /// API call accounting
    pub api_calls_made: ApiCallSummary,
}

impl ExportRecord {
    /// Render the record as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the record as pretty-printed JSON to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Stories attached to the task or subtask with the given gid
    pub fn stories_for<'a>(&'a self, gid: &'a str) -> impl Iterator<Item = &'a Story> + 'a {
        self.stories
            .iter()
            .filter(move |s| s.resource.as_ref().is_some_and(|r| r.gid == gid))
    }

    /// Subtasks whose parent is the task with the given gid
    pub fn subtasks_of<'a>(&'a self, gid: &'a str) -> impl Iterator<Item = &'a Subtask> + 'a {
        self.subtasks
            .iter()
            .filter(move |s| s.parent.as_ref().is_some_and(|p| p.gid == gid))
    }
}
