//! Authentication API endpoints
//!
//! Signup, login and current-user lookup for JWT-based sessions.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::user::User;
use crate::infrastructure::user::SignupRequest;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const MISSING_FIELDS: &str = "Missing required fields";

/// Create the authentication router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(get_current_user))
}

/// Signup request; absent fields are reported as a validation error
#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

/// User response (safe to expose)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub team_id: Option<String>,
    pub role_in_team: Option<String>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id().as_str().to_string(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            team_id: user.team_id().map(|id| id.as_str().to_string()),
            role_in_team: user
                .team_id()
                .map(|_| user.role_in_team().as_str().to_string()),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

/// Register a new account
///
/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupBody>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let user = state
        .user_service
        .signup(SignupRequest {
            name: body.name.unwrap_or_default(),
            email: body.email.unwrap_or_default(),
            password: body.password.unwrap_or_default(),
        })
        .await?;

    let token = state.jwt_service.generate(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: UserResponse::from_user(&user),
        }),
    ))
}

/// Login with email and password
///
/// POST /auth/login
///
/// Unknown email and wrong password get the same answer.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(ApiError::bad_request(MISSING_FIELDS)),
    };

    let user = state
        .user_service
        .authenticate(&email, &password)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let token = state.jwt_service.generate(&user)?;

    info!(user_id = %user.id(), "User logged in");

    Ok(Json(SessionResponse {
        token,
        user: UserResponse::from_user(&user),
    }))
}

/// Get current authenticated user
///
/// GET /auth/me
pub async fn get_current_user(RequireUser(user): RequireUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: UserResponse::from_user(&user),
    })
}
