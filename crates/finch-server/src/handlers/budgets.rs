//! Budget handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::info;

use super::{json_body, MonthQuery};
use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use finch_core::models::{Budget, BudgetStatus, BudgetUpdate, NewBudget};

/// GET /api/budgets - List budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Budget>>, AppError> {
    Ok(Json(state.db.list_budgets(user.id)?))
}

/// POST /api/budgets - Create a budget (409 if the category already has one)
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<NewBudget>, JsonRejection>,
) -> Result<Json<Budget>, AppError> {
    let req = json_body(payload)?;
    let budget = state.db.create_budget(user.id, &req)?;
    info!(user_id = user.id, category = %budget.category, "Created budget");
    Ok(Json(budget))
}

/// GET /api/budgets/:id - Get a single budget
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Budget>, AppError> {
    let budget = state
        .db
        .get_budget(user.id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Budget {} not found", id)))?;
    Ok(Json(budget))
}

/// PUT /api/budgets/:id - Change the limit or alert threshold
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Result<Json<BudgetUpdate>, JsonRejection>,
) -> Result<Json<Budget>, AppError> {
    let req = json_body(payload)?;
    Ok(Json(state.db.update_budget(user.id, id, &req)?))
}

/// DELETE /api/budgets/:id - Delete a budget
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_budget(user.id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/budgets/status?month=YYYY-MM - Spending against every budget
pub async fn budget_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<Vec<BudgetStatus>>, AppError> {
    let month = params.resolve()?;
    Ok(Json(state.db.budget_statuses(user.id, month)?))
}
