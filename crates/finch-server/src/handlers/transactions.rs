//! Transaction handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{json_body, parse_date};
use crate::{AppError, AppState, CurrentUser, SuccessResponse, MAX_PAGE_LIMIT};
use finch_core::models::{NewTransaction, Transaction, TransactionFilter};

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub account_id: Option<i64>,
    pub category: Option<String>,
    /// Start date (YYYY-MM-DD, inclusive)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD, inclusive)
    pub to: Option<String>,
    /// Substring of description or merchant
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionQuery {
    fn into_filter(self) -> Result<TransactionFilter, AppError> {
        let defaults = TransactionFilter::default();
        Ok(TransactionFilter {
            account_id: self.account_id,
            category: self.category.filter(|c| !c.trim().is_empty()),
            from: parse_date(self.from.as_deref(), "from")?,
            to: parse_date(self.to.as_deref(), "to")?,
            search: self.search.filter(|s| !s.trim().is_empty()),
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_LIMIT),
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

/// Paginated transaction listing
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    /// Matching transactions across all pages
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for recategorizing a transaction
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub category: String,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let filter = params.into_filter()?;

    let transactions = state.db.list_transactions(user.id, &filter)?;
    let total = state.db.count_transactions(user.id, &filter)?;

    Ok(Json(TransactionListResponse {
        transactions,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// POST /api/transactions - Record a manual transaction
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<Json<Transaction>, AppError> {
    let mut req = json_body(payload)?;
    req.external_id = None;

    let tx = state.db.insert_transaction(user.id, &req)?;
    info!(user_id = user.id, transaction_id = tx.id, "Created transaction");
    Ok(Json(tx))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let tx = state
        .db
        .get_transaction(user.id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;
    Ok(Json(tx))
}

/// PUT /api/transactions/:id/category - Recategorize a transaction
pub async fn update_transaction_category(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<Transaction>, AppError> {
    let req = json_body(payload)?;

    state
        .db
        .update_transaction_category(user.id, id, &req.category)?;

    let tx = state
        .db
        .get_transaction(user.id, id)?
        .ok_or_else(|| AppError::internal("Transaction not found after update"))?;
    Ok(Json(tx))
}

/// DELETE /api/transactions/:id - Delete a transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_transaction(user.id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
