//! Typed calls for the resources an export walks
//!
//! Each call wraps its failure with the resource it was fetching, e.g.
//! "failed to fetch tasks for project 1201: HTTP 403 from ...".

use super::ApiClient;
use crate::batch::fetch_for_many;
use crate::error::{Error, Result};
use crate::models::{Project, Story, Subtask, Task, User, Workspace};

/// Fields requested for projects
pub const PROJECT_FIELDS: &str = "name,owner,team,color,notes,archived,created_at,modified_at";

/// Fields requested for tasks
pub const TASK_FIELDS: &str = "name,created_at,created_by,completed_at,due_date,due_on,due_at,\
assignee,projects,tags,notes,subtasks,stories,parent,memberships,html_notes,permalink_url,\
start_on,resource_type,resource_subtype,approval_status,custom_fields,external,hearts,likes,\
num_hearts,num_likes,num_subtasks,completed_subtasks";

/// Fields requested for subtasks
pub const SUBTASK_FIELDS: &str = "name,created_at,created_by,completed_at,due_date,due_on,due_at,\
assignee,tags,notes,parent,projects,html_notes,permalink_url,start_on,resource_type,\
resource_subtype,approval_status,custom_fields,external,hearts,likes,num_hearts,num_likes,\
num_subtasks,completed_subtasks";

/// Fields requested for stories
pub const STORY_FIELDS: &str = "text,created_at,created_by,resource,resource_type,html_text,\
type,action_taken,action_taken_at,action_taken_by,old_value,new_value,resource_subtype";

fn fields(list: &str) -> [(&'static str, String); 1] {
    [("opt_fields", list.to_string())]
}

impl ApiClient {
    /// The user owning the access token
    pub async fn current_user(&self) -> Result<User> {
        self.fetch_one("/users/me", &[])
            .await
            .map_err(|e| Error::from(e).fetching("fetch user info"))
    }

    /// Every workspace visible to the user
    pub async fn workspaces(&self) -> Result<Vec<Workspace>> {
        self.fetch_all("/workspaces", &[])
            .await
            .map_err(|e| Error::from(e).fetching("fetch workspaces"))
    }

    /// Projects of one workspace, each tagged with `workspace_gid`
    pub async fn projects(&self, workspace_gid: &str) -> Result<Vec<Project>> {
        let path = format!("/workspaces/{}/projects", workspace_gid);
        let projects: Vec<Project> = self
            .fetch_all(&path, &fields(PROJECT_FIELDS))
            .await
            .map_err(|e| {
                Error::from(e).fetching(format!("fetch projects for workspace {}", workspace_gid))
            })?;

        Ok(projects
            .into_iter()
            .map(|p| p.in_workspace(workspace_gid))
            .collect())
    }

    /// Every task of one project, untagged
    pub async fn tasks(&self, project_gid: &str) -> Result<Vec<Task>> {
        let path = format!("/projects/{}/tasks", project_gid);
        self.fetch_all(&path, &fields(TASK_FIELDS))
            .await
            .map_err(|e| Error::from(e).fetching(format!("fetch tasks for project {}", project_gid)))
    }

    /// Every subtask of one task
    pub async fn subtasks(&self, task_gid: &str) -> Result<Vec<Subtask>> {
        let path = format!("/tasks/{}/subtasks", task_gid);
        self.fetch_all(&path, &fields(SUBTASK_FIELDS))
            .await
            .map_err(|e| Error::from(e).fetching(format!("fetch subtasks for task {}", task_gid)))
    }

    /// Every story (comment or activity) of one task
    pub async fn stories(&self, task_gid: &str) -> Result<Vec<Story>> {
        let path = format!("/tasks/{}/stories", task_gid);
        self.fetch_all(&path, &fields(STORY_FIELDS))
            .await
            .map_err(|e| Error::from(e).fetching(format!("fetch stories for task {}", task_gid)))
    }

    /// One task by gid
    pub async fn task(&self, task_gid: &str) -> Result<Task> {
        let path = format!("/tasks/{}", task_gid);
        self.fetch_one(&path, &fields(TASK_FIELDS))
            .await
            .map_err(|e| Error::from(e).fetching(format!("fetch task {}", task_gid)))
    }

    /// Look up many tasks at once, in the order of `task_gids`
    ///
    /// All lookups run concurrently, bounded only by the throttle gate. The
    /// first failure aborts the batch.
    pub async fn tasks_by_id(&self, task_gids: &[String]) -> Result<Vec<Task>> {
        let results = fetch_for_many(task_gids, |gid| async move { self.task(&gid).await })
            .await
            .map_err(|e| e.fetching("fetch batch tasks"))?;
        Ok(results.into_iter().map(|(_, task)| task).collect())
    }
}
