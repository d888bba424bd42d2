//! Team notification feed

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::notification::Notification;

const TEAM_ID_REQUIRED: &str = "teamId required";

pub fn create_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/read-all", post(mark_all_read))
        .route("/{team_id}", get(list_notifications))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAllBody {
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub team_id: String,
    pub title: String,
    pub subtitle: String,
    pub category: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationResponse {
    fn from_notification(notification: &Notification) -> Self {
        Self {
            id: notification.id().as_str().to_string(),
            team_id: notification.team_id().as_str().to_string(),
            title: notification.title().to_string(),
            subtitle: notification.subtitle().to_string(),
            category: notification.category().as_str().to_string(),
            read: notification.is_read(),
            created_at: notification.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub ok: bool,
    pub updated: usize,
}

/// GET /notifications/{team_id}
pub async fn list_notifications(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(team_id): Path<String>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let notifications = state
        .notification_service
        .list_for_member(&team_id, user.id())
        .await?;

    Ok(Json(NotificationsResponse {
        notifications: notifications
            .iter()
            .map(NotificationResponse::from_notification)
            .collect(),
    }))
}

/// POST /notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<ReadAllBody>,
) -> Result<Json<ReadAllResponse>, ApiError> {
    let team_id = body
        .team_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(TEAM_ID_REQUIRED))?;

    let updated = state
        .notification_service
        .mark_all_read_for_member(&team_id, user.id())
        .await?;

    Ok(Json(ReadAllResponse { ok: true, updated }))
}
