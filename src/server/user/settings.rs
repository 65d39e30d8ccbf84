use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::SettingsResponse;
use crate::server::response::{ApiError, ApiResponse};

/// Public branding, readable without a session.
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let settings = state.store.get_settings()?;
    Ok(Json(ApiResponse::success(SettingsResponse { settings })))
}
