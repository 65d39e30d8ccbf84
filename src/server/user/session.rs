use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireAuth;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CredentialsRequest, LoginResponse, UserEnvelope, UserResponse};
use crate::server::response::{ApiError, ApiJson, ApiResponse};

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, user) = state.auth.login(&req.username, &req.password)?;
    let grant = state.ledger.active_grant(&user.id)?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: UserResponse::new(&user, grant.as_ref(), Utc::now()),
    })))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.register(req.username.trim(), &req.password)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            UserEnvelope {
                user: UserResponse::new(&user, None, Utc::now()),
            },
        )),
    ))
}

/// Echoes the caller's identity with its current subscription.
pub async fn verify_token(
    RequireAuth(session): RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.store.get_user(&session.id)?.ok_or(Error::InvalidToken)?;
    let grant = state.ledger.active_grant(&user.id)?;

    Ok(Json(ApiResponse::success(UserEnvelope {
        user: UserResponse::new(&user, grant.as_ref(), Utc::now()),
    })))
}
