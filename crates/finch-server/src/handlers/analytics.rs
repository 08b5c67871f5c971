//! Spending analytics handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::MonthQuery;
use crate::{AppError, AppState, CurrentUser};
use finch_core::models::{AccountOverview, AnalyticsSummary, MerchantSpending, MonthlySummary};

const DEFAULT_TREND_MONTHS: u32 = 6;
const MAX_TREND_MONTHS: u32 = 24;
const DEFAULT_MERCHANT_LIMIT: i64 = 10;
const MAX_MERCHANT_LIMIT: i64 = 100;

/// Query parameters for the trend endpoint
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub months: Option<u32>,
}

/// Query parameters for the merchants endpoint
#[derive(Debug, Deserialize)]
pub struct MerchantsQuery {
    pub month: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/analytics/summary?month=YYYY-MM - Income, expenses and category breakdown
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let month = params.resolve()?;

    let summary = state.db.monthly_summary(user.id, month)?;
    let categories = state.db.spending_by_category(user.id, month)?;

    Ok(Json(AnalyticsSummary {
        summary,
        categories,
    }))
}

/// GET /api/analytics/trends?months=N - Month-by-month totals, oldest first
pub async fn analytics_trends(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<TrendsQuery>,
) -> Result<Json<Vec<MonthlySummary>>, AppError> {
    let months = params
        .months
        .unwrap_or(DEFAULT_TREND_MONTHS)
        .clamp(1, MAX_TREND_MONTHS);
    let today = Utc::now().date_naive();
    Ok(Json(state.db.monthly_trend(user.id, today, months)?))
}

/// GET /api/analytics/merchants?month=YYYY-MM&limit=N - Top merchants by spend
pub async fn analytics_merchants(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<MerchantsQuery>,
) -> Result<Json<Vec<MerchantSpending>>, AppError> {
    let month = MonthQuery {
        month: params.month,
    }
    .resolve()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_MERCHANT_LIMIT)
        .clamp(1, MAX_MERCHANT_LIMIT);

    Ok(Json(state.db.top_merchants(user.id, month, limit)?))
}

/// GET /api/analytics/overview - Assets, liabilities and net worth
pub async fn analytics_overview(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<AccountOverview>, AppError> {
    Ok(Json(state.db.account_overview(user.id)?))
}
