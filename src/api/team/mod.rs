//! Team endpoints: create, join by code, and team reads

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
use crate::domain::membership::TeamView;

pub fn create_team_router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_team))
        .route("/join", post(join_team))
        .route("/me", get(get_my_team))
        .route("/{team_id}", get(get_team))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTeamBody {
    #[serde(default)]
    pub team_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: TeamView,
}

/// POST /team/create
pub async fn create_team(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateTeamBody>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    let team = state
        .membership_service
        .create_team(
            user.id(),
            body.name.as_deref().unwrap_or_default(),
            body.description.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// POST /team/join
pub async fn join_team(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<JoinTeamBody>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state
        .membership_service
        .join_team(user.id(), body.team_code.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(TeamResponse { team }))
}

/// GET /team/me
pub async fn get_my_team(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.membership_service.get_team_for_user(user.id()).await?;
    Ok(Json(TeamResponse { team }))
}

/// GET /team/{team_id}
pub async fn get_team(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    Path(team_id): Path<String>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.membership_service.get_team_by_id(&team_id).await?;
    Ok(Json(TeamResponse { team }))
}
