//! Bank aggregation (Teller) handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tracing::info;

use super::json_body;
use crate::{AppError, AppState, CurrentUser};
use finch_core::models::{Account, TellerEnrollment};
use finch_core::{TellerClient, TellerSyncResult};

/// What the Teller Connect widget hands the browser on success
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(alias = "enrollmentId")]
    pub enrollment_id: String,
    #[serde(default)]
    pub institution: String,
}

/// POST /api/teller/enrollments - Store an access token from Teller Connect
pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<EnrollmentRequest>, JsonRejection>,
) -> Result<Json<TellerEnrollment>, AppError> {
    let req = json_body(payload)?;

    let id = state.db.save_enrollment(
        user.id,
        &req.enrollment_id,
        &req.institution,
        &req.access_token,
    )?;
    let enrollment = state
        .db
        .list_enrollments(user.id)?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::internal("Enrollment not found after save"))?;

    info!(user_id = user.id, enrollment = %enrollment.enrollment_id, "Saved Teller enrollment");
    Ok(Json(enrollment))
}

/// GET /api/teller/accounts - Accounts linked through Teller
pub async fn list_linked_accounts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.db.list_linked_accounts(user.id)?))
}

/// POST /api/teller/sync - Pull accounts and transactions for every enrollment
pub async fn sync_teller(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<TellerSyncResult>, AppError> {
    let client = TellerClient::new(&state.teller)?;
    Ok(Json(client.sync_user(&state.db, user.id).await?))
}
