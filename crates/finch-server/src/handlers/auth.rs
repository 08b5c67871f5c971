//! Registration, login and session handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::Deserialize;
use tracing::{info, warn};

use super::json_body;
use crate::{bearer_token, AppError, AppState, CurrentUser, SuccessResponse};
use finch_core::models::{AuthResponse, NewUser, User};

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/register - Create a user and start a session
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let new_user = json_body(payload)?;

    let user = state.db.create_user(&new_user)?;
    let token = state.db.create_session(user.id)?;

    info!(user_id = user.id, "Registered user");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/login - Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = json_body(payload)?;

    let Some(user) = state.db.verify_password(&req.email, &req.password)? else {
        warn!("Failed login attempt");
        return Err(AppError::unauthorized("Invalid email or password"));
    };
    let token = state.db.create_session(user.id)?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/logout - Revoke the current session token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.db.delete_session(token)?;
        info!(user_id = user.id, "User logged out");
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/auth/me - The authenticated user
pub async fn get_me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}
