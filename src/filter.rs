//! Export scope and the task/subtask selection it implies

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;
use crate::models::{Task, User};

/// Which tasks and subtasks end up in an export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportScope {
    /// Every task of every accessible project
    All,
    /// Tasks assigned to or created by the user
    #[default]
    UserOnly,
    /// Tasks assigned to the user
    AssignedOnly,
    /// Completed tasks assigned to the user
    CompletedAssigned,
}

impl ExportScope {
    /// Every scope, widest first
    pub const ALL: [ExportScope; 4] = [
        ExportScope::All,
        ExportScope::UserOnly,
        ExportScope::AssignedOnly,
        ExportScope::CompletedAssigned,
    ];

    /// Parse a scope name, falling back to [`ExportScope::All`] for anything unknown
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(scope = value, "Unknown export scope, exporting all tasks");
            ExportScope::All
        })
    }

    /// Wire name of the scope
    pub fn as_str(self) -> &'static str {
        match self {
            ExportScope::All => "all",
            ExportScope::UserOnly => "user-only",
            ExportScope::AssignedOnly => "assigned-only",
            ExportScope::CompletedAssigned => "completed-assigned",
        }
    }

    /// Whether `task` belongs in an export of this scope for `user_gid`
    pub fn includes(self, task: &Task, user_gid: &str) -> bool {
        match self {
            ExportScope::All => true,
            ExportScope::UserOnly => task.is_assigned_to(user_gid) || task.is_created_by(user_gid),
            ExportScope::AssignedOnly => task.is_assigned_to(user_gid),
            ExportScope::CompletedAssigned => task.is_assigned_to(user_gid) && task.is_completed(),
        }
    }

    /// Whether subtasks are filtered as well
    ///
    /// Only `completed-assigned` narrows the subtask list; every other scope
    /// keeps all subtasks of the selected tasks.
    pub fn filters_subtasks(self) -> bool {
        matches!(self, ExportScope::CompletedAssigned)
    }

    /// Progress message reporting how many tasks survived the filter
    pub fn summary_message(self, kept: usize, total: usize) -> String {
        match self {
            ExportScope::All => {
                format!("Exporting all {} tasks from accessible projects", total)
            }
            ExportScope::UserOnly => format!(
                "Found {} tasks assigned to or created by you out of {} total tasks",
                kept, total
            ),
            ExportScope::AssignedOnly => format!(
                "Found {} tasks assigned to you out of {} total tasks",
                kept, total
            ),
            ExportScope::CompletedAssigned => format!(
                "Found {} completed tasks assigned to you out of {} total tasks",
                kept, total
            ),
        }
    }
}

impl FromStr for ExportScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ExportScope::All),
            "user-only" => Ok(ExportScope::UserOnly),
            "assigned-only" => Ok(ExportScope::AssignedOnly),
            "completed-assigned" => Ok(ExportScope::CompletedAssigned),
            other => Err(Error::Config {
                message: format!(
                    "unknown export scope '{}', expected one of: all, user-only, assigned-only, completed-assigned",
                    other
                ),
                key: Some("scope".to_string()),
            }),
        }
    }
}

impl std::fmt::Display for ExportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep the tasks `scope` selects for `user`, preserving order
pub fn filter(tasks: Vec<Task>, user: &User, scope: ExportScope) -> Vec<Task> {
    if scope == ExportScope::All {
        return tasks;
    }
    tasks
        .into_iter()
        .filter(|task| scope.includes(task, &user.gid))
        .collect()
}
