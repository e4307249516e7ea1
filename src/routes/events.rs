use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::Medium,
    routes::AppState,
    services::analytics::spawn_click,
};

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub collection_type: Medium,
    pub doc_id: String,
    pub user_id: String,
}

/// Accepts a click and forwards it to the engine in the background
pub async fn click(
    State(state): State<AppState>,
    Json(body): Json<ClickRequest>,
) -> AppResult<StatusCode> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() || body.doc_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "user_id and doc_id are required".to_string(),
        ));
    }

    spawn_click(
        state.gateway.clone(),
        body.collection_type,
        user_id,
        body.doc_id.trim(),
    );

    Ok(StatusCode::ACCEPTED)
}
