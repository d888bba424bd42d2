//! Team task endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::task::{Task, TaskStatus};
use crate::infrastructure::task::{NewTask, TaskUpdate};

const TEAM_ID_REQUIRED: &str = "teamId required";

/// `/{id}` is a team id for GET and a task id for PATCH
pub fn create_tasks_router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_task))
        .route("/{id}", get(list_tasks).patch(update_task))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskBody {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub team_id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().to_string(),
            team_id: task.team_id().to_string(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            assigned_to: task.assigned_to().map(|id| id.to_string()),
            status: task.status(),
            created_at: task.created_at().to_rfc3339(),
            updated_at: task.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskEnvelope {
    pub task: TaskResponse,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskResponse>,
}

/// POST /tasks
pub async fn add_task(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<AddTaskBody>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    let team_id = body
        .team_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(TEAM_ID_REQUIRED))?;
    let task = state
        .task_service
        .add_task(
            user.id(),
            &team_id,
            NewTask {
                title: body.title.unwrap_or_default(),
                description: body.description,
                assigned_to: body.assigned_to,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            task: TaskResponse::from(&task),
        }),
    ))
}

/// PATCH /tasks/{task_id}
pub async fn update_task(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(task_id): Path<String>,
    Json(body): Json<UpdateTaskBody>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let task = state
        .task_service
        .update_task(
            user.id(),
            &task_id,
            TaskUpdate {
                title: body.title,
                description: body.description,
                status: body.status,
                assigned_to: body.assigned_to,
            },
        )
        .await?;

    Ok(Json(TaskEnvelope {
        task: TaskResponse::from(&task),
    }))
}

/// GET /tasks/{team_id}
pub async fn list_tasks(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(team_id): Path<String>,
) -> Result<Json<TasksResponse>, ApiError> {
    let tasks = state
        .task_service
        .list_for_member(&team_id, user.id())
        .await?;

    Ok(Json(TasksResponse {
        tasks: tasks.iter().map(TaskResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};

    use crate::api::test_support::{create_team_view, join_team, send, signup, test_app};

    async fn add(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
        send(app, Method::POST, "/tasks", Some(token), Some(body)).await
    }

    /// Wait until the dispatcher has stored a notification titled `title`
    async fn wait_for_notification(app: &Router, token: &str, team_id: &str, title: &str) {
        for _ in 0..50 {
            let (_, body) = send(
                app,
                Method::GET,
                &format!("/notifications/{}", team_id),
                Some(token),
                None,
            )
            .await;

            let found = body["notifications"]
                .as_array()
                .map(|list| list.iter().any(|n| n["title"] == title))
                .unwrap_or(false);
            if found {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("notification '{}' never arrived", title);
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let app = test_app();
        let alice = signup(&app, "Alice", "a@x.io").await;
        let bob = signup(&app, "Bob", "b@x.io").await;
        let team = create_team_view(&app, &alice.token, "Rocket").await;
        let team_id = team["id"].as_str().unwrap();
        join_team(&app, &bob.token, team["teamCode"].as_str().unwrap()).await;

        let (status, body) = add(
            &app,
            &alice.token,
            json!({
                "teamId": team_id,
                "title": "Pitch deck",
                "description": "ten slides",
                "assignedTo": bob.user_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["task"]["status"], "Pending");
        assert_eq!(body["task"]["assignedTo"], bob.user_id.as_str());
        let task_id = body["task"]["id"].as_str().unwrap().to_string();

        wait_for_notification(&app, &bob.token, team_id, "New Task").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/tasks/{}", task_id),
            Some(&bob.token),
            Some(json!({"status": "In Progress"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["status"], "In Progress");

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("/tasks/{}", task_id),
            Some(&bob.token),
            Some(json!({"status": "Completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        wait_for_notification(&app, &alice.token, team_id, "Task Completed").await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/tasks/{}", team_id),
            Some(&alice.token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(body["tasks"][0]["status"], "Completed");
    }

    #[tokio::test]
    async fn test_tasks_are_member_only() {
        let app = test_app();
        let alice = signup(&app, "Alice", "a@x.io").await;
        let mallory = signup(&app, "Mallory", "m@x.io").await;
        let team = create_team_view(&app, &alice.token, "Rocket").await;
        let team_id = team["id"].as_str().unwrap();

        let (status, body) = add(&app, &mallory.token, json!({"teamId": team_id, "title": "Spam"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/tasks/{}", team_id),
            Some(&mallory.token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::POST, "/tasks", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_task_request_errors() {
        let app = test_app();
        let alice = signup(&app, "Alice", "a@x.io").await;
        let team = create_team_view(&app, &alice.token, "Rocket").await;
        let team_id = team["id"].as_str().unwrap();

        let (status, body) = add(&app, &alice.token, json!({"title": "Demo"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "teamId required");

        let (status, body) = add(&app, &alice.token, json!({"teamId": team_id})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Title required");

        let (status, body) = add(&app, &alice.token, json!({"teamId": team_id, "title": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Title required");

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/tasks/not-a-task",
            Some(&alice.token),
            Some(json!({"status": "Completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = add(&app, &alice.token, json!({"teamId": team_id, "title": "Demo"})).await;
        let task_id = body["task"]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/tasks/{}", task_id),
            Some(&alice.token),
            Some(json!({"status": "Done"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }
}
