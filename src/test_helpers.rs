//! Shared helpers for unit tests: mock-server clients and JSON fixtures

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::MockServer;

use crate::client::ApiClient;
use crate::config::{Config, RetryConfig};

/// Config pointing at `server` with short delays so tests run fast
pub(crate) fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.retry = RetryConfig {
        base_delay: Duration::from_millis(10),
        ..RetryConfig::default()
    };
    config.batch.inter_chunk_delay = Duration::from_millis(1);
    config
}

/// Client for `server` authenticated as "test-token"
pub(crate) fn test_client(server: &MockServer) -> ApiClient {
    ApiClient::from_config(&test_config(server), "test-token").unwrap()
}

/// `{ "data": [...] }` list envelope without a next page
pub(crate) fn list_body(items: Vec<Value>) -> Value {
    json!({ "data": items, "next_page": null })
}

/// `{ "data": [...] }` list envelope pointing at `offset`
pub(crate) fn list_page(items: Vec<Value>, offset: &str) -> Value {
    json!({
        "data": items,
        "next_page": { "offset": offset, "path": "/next", "uri": "https://example.test/next" }
    })
}

/// Task payload with the fields the scope filter looks at
pub(crate) fn task_json(
    gid: &str,
    assignee: Option<&str>,
    creator: Option<&str>,
    completed: bool,
    num_subtasks: u32,
) -> Value {
    json!({
        "gid": gid,
        "name": format!("Task {gid}"),
        "created_at": "2024-01-01T00:00:00.000Z",
        "completed_at": if completed { json!("2024-01-15T00:00:00.000Z") } else { Value::Null },
        "assignee": assignee.map(|a| json!({ "gid": a })),
        "created_by": creator.map(|c| json!({ "gid": c })),
        "num_subtasks": num_subtasks,
        "tags": [],
        "notes": ""
    })
}

/// Subtask payload whose parent is `parent`
pub(crate) fn subtask_json(gid: &str, parent: &str, assignee: Option<&str>, completed: bool) -> Value {
    let mut subtask = task_json(gid, assignee, None, completed, 0);
    subtask["parent"] = json!({ "gid": parent });
    subtask
}

/// Story payload attached to `resource`
pub(crate) fn story_json(gid: &str, resource: &str) -> Value {
    json!({
        "gid": gid,
        "text": format!("Comment {gid}"),
        "created_at": "2024-01-20T00:00:00.000Z",
        "created_by": { "gid": "u1", "name": "Demo User" },
        "resource": { "gid": resource },
        "resource_subtype": "comment_added"
    })
}
