//! Mock Asana accounts for integration tests

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One mocked account: a user with one workspace and one project
pub struct MockAccount {
    /// Bearer token the account answers to
    pub token: &'static str,
    /// User gid
    pub user: &'static str,
    /// Number of tasks in the project, all assigned to the user
    pub task_count: usize,
}

fn list(items: Vec<Value>) -> Value {
    json!({ "data": items, "next_page": null })
}

async fn mount(server: &MockServer, token: &str, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount `account` on `server`
///
/// Every route answers only requests carrying the account's token, so two
/// accounts can share the same paths.
pub async fn mount_account(server: &MockServer, account: &MockAccount) {
    let token = account.token;
    mount(
        server,
        token,
        "/users/me",
        json!({ "data": { "gid": account.user, "name": account.user } }),
    )
    .await;
    mount(
        server,
        token,
        "/workspaces",
        list(vec![json!({ "gid": "w1", "name": format!("{} workspace", account.user) })]),
    )
    .await;
    mount(
        server,
        token,
        "/workspaces/w1/projects",
        list(vec![json!({ "gid": "p1", "name": "Roadmap" })]),
    )
    .await;

    let tasks = (0..account.task_count)
        .map(|i| {
            json!({
                "gid": format!("{}-t{}", account.user, i),
                "name": format!("Task {i}"),
                "assignee": { "gid": account.user },
                "completed_at": null,
                "num_subtasks": 0
            })
        })
        .collect();
    mount(server, token, "/projects/p1/tasks", list(tasks)).await;
}
