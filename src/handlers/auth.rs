use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::AppJson;
use super::{path_id, required_text, write_error};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Identity, Role, User};
use crate::state::AppState;

/// Resolves the bearer token on a request into the caller's identity.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    state.credentials.verify_token(token)
}

/// Operations staff or admin.
pub fn require_staff(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let identity = authenticate(state, headers)?;
    if !identity.role.is_staff() {
        return Err(AppError::Forbidden(
            "access restricted to operations team".to_string(),
        ));
    }
    Ok(identity)
}

pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let identity = authenticate(state, headers)?;
    if identity.role != Role::Admin {
        return Err(AppError::Forbidden("access restricted to admins".to_string()));
    }
    Ok(identity)
}

/// Runs password hashing work on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("credential task failed: {e}")))?
}

#[derive(Serialize)]
pub struct AuthResponse {
    user: User,
    token: String,
}

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = required_text("name", &payload.name)?;
    let email = required_text("email", &payload.email)?.to_lowercase();
    let username = required_text("username", &payload.username)?;
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::invalid("password", "is required"))?;

    let hasher = Arc::clone(&state);
    let password_hash = off_runtime(move || hasher.credentials.hash_password(&password)).await?;
    let now = state.clock.now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        username,
        password_hash,
        role: Role::Customer,
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.conn()?;
        queries::insert_user(&db, &user).map_err(|e| match write_error(e, "user") {
            AppError::Conflict(_) => AppError::Conflict("user already exists".to_string()),
            other => other,
        })?;
    }

    let token = state.credentials.issue_token(&user.id, user.role)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = required_text("email", &payload.email)?.to_lowercase();
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::invalid("password", "is required"))?;

    let user = {
        let db = state.conn()?;
        queries::get_user_by_email(&db, &email)?
    };

    let Some(user) = user else {
        tracing::info!(email = %email, "failed login");
        return Err(AppError::Unauthorized);
    };

    let verifier = Arc::clone(&state);
    let hash = user.password_hash.clone();
    let verified =
        off_runtime(move || verifier.credentials.verify_password(&password, &hash)).await?;
    if !verified {
        tracing::info!(email = %email, "failed login");
        return Err(AppError::Unauthorized);
    }

    let token = state.credentials.issue_token(&user.id, user.role)?;
    Ok(Json(AuthResponse { user, token }))
}

// PATCH /api/auth/promote
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

pub async fn promote(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<PromoteRequest>,
) -> Result<Json<User>, AppError> {
    let admin = require_admin(&state, &headers)?;

    let user_id = path_id(&required_text("userId", &payload.user_id)?)
        .map_err(|_| AppError::invalid("userId", "is not a valid identifier"))?;
    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| AppError::invalid("role", "must be one of: customer, operations, admin"))?;

    let db = state.conn()?;
    if !queries::update_user_role(&db, &user_id, role, &state.clock.now())? {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    let user = queries::get_user(&db, &user_id)?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    tracing::info!(admin_id = %admin.user_id, user_id = %user.id, role = role.as_str(), "role changed");
    Ok(Json(user))
}
