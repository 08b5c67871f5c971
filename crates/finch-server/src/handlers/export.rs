//! Export handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
    Extension,
};
use serde::Deserialize;
use tracing::info;

use super::parse_date;
use crate::{AppError, AppState, CurrentUser};
use finch_core::TransactionExportOptions;

/// Query parameters for transaction export
#[derive(Debug, Deserialize)]
pub struct TransactionExportQuery {
    /// Output format (default: csv)
    #[serde(default = "default_format")]
    pub format: String,
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
}

fn default_format() -> String {
    "csv".to_string()
}

fn attachment(content_type: &str, filename: &str, body: String) -> Result<Response<Body>, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::internal(&e.to_string()))
}

/// GET /api/export/transactions - Export transactions to CSV or JSON
pub async fn export_transactions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<TransactionExportQuery>,
) -> Result<Response<Body>, AppError> {
    let opts = TransactionExportOptions {
        from: parse_date(params.from.as_deref(), "from")?,
        to: parse_date(params.to.as_deref(), "to")?,
    };

    match params.format.as_str() {
        "csv" => {
            let csv = state.db.export_transactions_csv(user.id, &opts)?;
            let lines = csv.lines().count().saturating_sub(1);
            info!(user_id = user.id, "Exported {} transactions to CSV", lines);
            attachment("text/csv; charset=utf-8", "transactions.csv", csv)
        }
        "json" => {
            let rows = state.db.export_transactions(user.id, &opts)?;
            let json = serde_json::to_string_pretty(&rows)?;
            info!(user_id = user.id, "Exported {} transactions to JSON", rows.len());
            attachment("application/json", "transactions.json", json)
        }
        _ => Err(AppError::bad_request("Invalid format. Use 'csv' or 'json'")),
    }
}
