use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{GrantResponse, GrantSubscriptionRequest, SubscriptionResponse, UserResponse, UsersResponse};
use crate::server::response::{ApiError, ApiJson, ApiResponse};
use crate::types::SubscriptionType;

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.list_users()?;

    Ok(Json(ApiResponse::success(UsersResponse {
        users: users.iter().map(UserResponse::from).collect(),
    })))
}

/// Replaces the user's active grant. `days` defaults to the plan length.
pub async fn grant_subscription(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GrantSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription_type = SubscriptionType::parse(&req.subscription_type)
        .ok_or_else(|| ApiError::bad_request("Invalid subscription type"))?;
    let days = req.days.unwrap_or(subscription_type.default_days());

    let grant = state.ledger.grant(&admin, &id, subscription_type, days)?;

    Ok(Json(ApiResponse::with_message(
        "Subscription updated successfully",
        GrantResponse {
            subscription: SubscriptionResponse::from_grant(&grant, Utc::now()),
        },
    )))
}
