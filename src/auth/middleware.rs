use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::SessionUser;
use super::helpers::{TokenExtractionError, extract_bearer_token};
use crate::error::Error;
use crate::server::AppState;
use crate::types::Role;

/// Extractor that requires any valid session
pub struct RequireAuth(pub SessionUser);

/// Extractor that requires a session whose role is admin
pub struct RequireAdmin(pub SessionUser);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Access token required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "message": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"filegate\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_session(parts, state)?;
        Ok(RequireAuth(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_session(parts, state)?;

        match user.role {
            Role::Admin => Ok(RequireAdmin(user)),
            Role::User => Err(AuthError::NotAdmin),
        }
    }
}

fn extract_and_validate_session(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<SessionUser, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_bearer_token(auth_header)
        .map_err(|e| match e {
            TokenExtractionError::InvalidScheme => AuthError::InvalidScheme,
            TokenExtractionError::EmptyToken => AuthError::InvalidToken,
        })?
        .ok_or(AuthError::MissingAuth)?;

    let user = state.auth.verify(raw_token).map_err(|e| match e {
        Error::TokenExpired => AuthError::TokenExpired,
        Error::InvalidToken => AuthError::InvalidToken,
        e => {
            tracing::error!("Session validation failed: {e}");
            AuthError::InternalError
        }
    })?;

    Ok(SessionUser::from(&user))
}
