use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{SettingsRequest, SettingsResponse};
use crate::server::response::{ApiError, ApiJson, ApiResponse};

pub async fn get_settings(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.store.get_settings()?;
    Ok(Json(ApiResponse::success(SettingsResponse { settings })))
}

pub async fn update_settings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = req.into_settings();
    state.store.update_settings(&settings)?;

    info!(admin = %admin.username, site_name = %settings.site_name, "Settings updated");

    Ok(Json(ApiResponse::with_message(
        "Settings updated successfully",
        SettingsResponse { settings },
    )))
}
