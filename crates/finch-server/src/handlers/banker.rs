//! AI banker handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::{AppError, AppState, CurrentUser};
use finch_core::{build_financial_context, BankerClient, Conversation};

/// POST /api/banker/conversation - Start a video call with the AI banker
///
/// 503 when Tavus isn't configured.
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Conversation>, AppError> {
    let client = BankerClient::new(&state.banker)?;

    let context = build_financial_context(&state.db, user.id, Utc::now().date_naive())?;
    let name = format!("Finch banker for {}", user.name);

    Ok(Json(client.create_conversation(&name, &context).await?))
}
