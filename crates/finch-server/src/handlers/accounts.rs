//! Account management handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use super::json_body;
use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use finch_core::models::{Account, NewAccount};

/// Request body for overwriting an account's balances
#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub current_balance: f64,
    #[serde(default)]
    pub available_balance: Option<f64>,
}

/// GET /api/accounts - List the user's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.db.list_accounts(user.id)?))
}

/// POST /api/accounts - Create a manual account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> Result<Json<Account>, AppError> {
    let mut req = json_body(payload)?;
    // External ids belong to the aggregator sync
    req.external_id = None;

    let account = state.db.create_account(user.id, &req)?;
    info!(user_id = user.id, account_id = account.id, "Created account");
    Ok(Json(account))
}

/// GET /api/accounts/:id - Get a single account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .get_account(user.id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;
    Ok(Json(account))
}

/// PUT /api/accounts/:id/balance - Overwrite balances
pub async fn update_account_balance(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateBalanceRequest>, JsonRejection>,
) -> Result<Json<Account>, AppError> {
    let req = json_body(payload)?;

    state
        .db
        .update_account_balance(user.id, id, req.current_balance, req.available_balance)?;

    let account = state
        .db
        .get_account(user.id, id)?
        .ok_or_else(|| AppError::internal("Account not found after update"))?;
    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Delete an account and its transactions
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_account(user.id, id)?;
    info!(user_id = user.id, account_id = id, "Deleted account");
    Ok(Json(SuccessResponse { success: true }))
}
