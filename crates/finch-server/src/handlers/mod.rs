//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod analytics;
pub mod auth;
pub mod banker;
pub mod budgets;
pub mod export;
pub mod portfolio;
pub mod teller;
pub mod transactions;

// Re-export all handlers for use in router
pub use accounts::*;
pub use analytics::*;
pub use auth::*;
pub use banker::*;
pub use budgets::*;
pub use export::*;
pub use portfolio::*;
pub use teller::*;
pub use transactions::*;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::AppError;
use finch_core::db::parse_month;

/// GET /health - Liveness check (no auth)
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Unwrap a JSON body, answering malformed input with a 400 in the API's error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::bad_request(&e.body_text()))
}

/// `?month=YYYY-MM` (defaults to the current month)
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    pub(crate) fn resolve(&self) -> Result<NaiveDate, AppError> {
        match self.month.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(month) => parse_month(month)
                .map_err(|_| AppError::bad_request("Invalid month (use YYYY-MM)")),
            None => Ok(Utc::now().date_naive()),
        }
    }
}

/// Parse an optional `YYYY-MM-DD` query value
pub(crate) fn parse_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request(&format!("Invalid '{}' date format (use YYYY-MM-DD)", name)))
}
