//! Typed schemas for the Asana resources that make up an export
//!
//! Each struct names the fields the exporter relies on. Any other field the
//! API returns for the requested `opt_fields` is kept verbatim in `extra` so
//! the export does not silently drop data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra response fields not modeled explicitly
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Compact reference to another resource (`{ "gid": .., "name": .. }`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Resource gid
    pub gid: String,
    /// Display name, when the API includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource type (e.g., "user", "task")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl Reference {
    /// Reference with only a gid
    pub fn new(gid: impl Into<String>) -> Self {
        Self {
            gid: gid.into(),
            name: None,
            resource_type: None,
        }
    }
}

/// The user owning the access token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User gid
    pub gid: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address (absent when the token lacks the email scope)
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A workspace or organization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace gid
    pub gid: String,
    /// Workspace name
    #[serde(default)]
    pub name: String,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A project, tagged with the workspace it was listed under
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project gid
    pub gid: String,
    /// Project name
    #[serde(default)]
    pub name: String,
    /// Gid of the owning workspace
    ///
    /// The project listing does not return this; it is attached when the
    /// project is fetched so every exported project names its workspace.
    #[serde(default)]
    pub workspace: String,
    /// Project owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Reference>,
    /// Owning team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Reference>,
    /// Whether the project is archived
    #[serde(default)]
    pub archived: bool,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Project {
    /// Attach the gid of the workspace this project was listed under
    #[must_use]
    pub fn in_workspace(mut self, workspace_gid: &str) -> Self {
        self.workspace = workspace_gid.to_string();
        self
    }
}

/// A task or subtask
///
/// Top-level tasks carry `project` and `workspace` annotations added at
/// fetch time. Subtasks always carry `parent` and never the annotations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task gid
    pub gid: String,
    /// Task name
    #[serde(default)]
    pub name: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Completion time (`None` while incomplete)
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Due date (date only)
    #[serde(default)]
    pub due_on: Option<String>,
    /// Due time (date and time)
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    /// Assigned user
    #[serde(default)]
    pub assignee: Option<Reference>,
    /// Creating user
    #[serde(default)]
    pub created_by: Option<Reference>,
    /// Parent task (set for subtasks)
    #[serde(default)]
    pub parent: Option<Reference>,
    /// Projects the task belongs to
    #[serde(default)]
    pub projects: Vec<Reference>,
    /// Tags on the task
    #[serde(default)]
    pub tags: Vec<Reference>,
    /// Free-text description
    #[serde(default)]
    pub notes: Option<String>,
    /// Number of subtasks
    #[serde(default)]
    pub num_subtasks: u32,
    /// Stories included in the list payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories: Option<Vec<Reference>>,
    /// Gid of the project this task was listed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Gid of the workspace owning `project`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Subtasks share the task schema; `parent` is always set
pub type Subtask = Task;

impl Task {
    /// Minimal task with the given gid and name
    pub fn new(gid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            created_at: None,
            completed_at: None,
            due_on: None,
            due_at: None,
            assignee: None,
            created_by: None,
            parent: None,
            projects: Vec::new(),
            tags: Vec::new(),
            notes: None,
            num_subtasks: 0,
            stories: None,
            project: None,
            workspace: None,
            extra: ExtraFields::new(),
        }
    }

    /// Attach the project and workspace this task was listed under
    #[must_use]
    pub fn in_project(mut self, project: &Project) -> Self {
        self.project = Some(project.gid.clone());
        self.workspace = Some(project.workspace.clone());
        self
    }

    /// Whether `user_gid` is the assignee
    pub fn is_assigned_to(&self, user_gid: &str) -> bool {
        self.assignee.as_ref().is_some_and(|a| a.gid == user_gid)
    }

    /// Whether `user_gid` created the task
    pub fn is_created_by(&self, user_gid: &str) -> bool {
        self.created_by.as_ref().is_some_and(|c| c.gid == user_gid)
    }

    /// Whether the task has been completed
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whether the task reports any subtasks
    pub fn has_subtasks(&self) -> bool {
        self.num_subtasks > 0
    }

    /// Whether the list payload already carried stories for this task
    pub fn has_stories(&self) -> bool {
        self.stories.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// A comment or activity entry attached to a task or subtask
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Story gid
    pub gid: String,
    /// Plain-text body
    #[serde(default)]
    pub text: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Author
    #[serde(default)]
    pub created_by: Option<Reference>,
    /// The task or subtask the story is attached to
    #[serde(default)]
    pub resource: Option<Reference>,
    /// Story subtype (e.g., "comment_added")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_subtype: Option<String>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: ExtraFields,
}
