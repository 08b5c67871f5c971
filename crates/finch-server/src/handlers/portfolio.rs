//! Stock recommendations and market data handlers
//!
//! None of these fail on provider outages: the analyzer substitutes static
//! quotes and randomized indicators instead.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::{refresh_once, AppError, AppState};
use finch_core::market::scorer::DEFAULT_RISK_TOLERANCE;
use finch_core::market::{normalize_risk, validate_symbol};
use finch_core::{CryptoQuote, MarketSnapshot, RecommendationsResponse, RiskCategory, StockQuote};

/// Query parameters for recommendations
#[derive(Debug, Deserialize)]
pub struct RiskQuery {
    /// Risk tolerance in [0, 1] (default 0.5)
    pub risk: Option<f64>,
}

async fn recommendations(state: &AppState, risk_tolerance: f64) -> RecommendationsResponse {
    let risk_tolerance = normalize_risk(risk_tolerance);
    let recommendations = state.market.get_recommendations(risk_tolerance).await;
    debug!(risk_tolerance, count = recommendations.len(), "Served recommendations");
    RecommendationsResponse {
        risk_tolerance,
        recommendations,
    }
}

/// GET /api/portfolio/recommendations?risk=0.5 - Top watchlist picks
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RiskQuery>, QueryRejection>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::bad_request(&e.body_text()))?;
    let risk = params.risk.unwrap_or(DEFAULT_RISK_TOLERANCE);
    Ok(Json(recommendations(&state, risk).await))
}

/// GET /api/portfolio/recommendations/:category - Picks for conservative, moderate or aggressive
pub async fn get_recommendations_for_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    let category: RiskCategory = category.parse().map_err(|_| {
        AppError::bad_request(&format!(
            "Unknown risk category '{}' (use conservative, moderate or aggressive)",
            category
        ))
    })?;
    Ok(Json(recommendations(&state, category.tolerance()).await))
}

/// GET /api/portfolio/quote/:symbol - Latest quote for one symbol
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<StockQuote>, AppError> {
    let symbol = validate_symbol(&symbol)?;

    Ok(Json(state.market.get_stock_quote(&symbol).await))
}

/// GET /api/portfolio/market - Latest refresher snapshot
///
/// With the refresher disabled every request fetches fresh quotes.
pub async fn get_market(State(state): State<Arc<AppState>>) -> Json<MarketSnapshot> {
    if state.config.market_refresh.is_none() {
        return Json(state.market.snapshot().await);
    }
    if let Some(snapshot) = state.snapshot.read().await.clone() {
        return Json(snapshot);
    }
    // Refresher hasn't finished its first round yet
    Json(refresh_once(&state).await)
}

/// GET /api/portfolio/crypto - Crypto prices
pub async fn get_crypto(State(state): State<Arc<AppState>>) -> Json<Vec<CryptoQuote>> {
    Json(state.market.get_crypto_quotes().await)
}
