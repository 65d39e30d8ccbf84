use axum::{
    Json,
    extract::{
        FromRequest,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::catalog::{ALLOWED_EXTENSIONS, format_file_size};
use crate::error::Error;

/// Standard API response wrapper: `{success, message?, ...payload}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that carry nothing beyond the envelope.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

impl ApiResponse<Empty> {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_message(message, Empty {})
    }
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected a JSON body with Content-Type: application/json".to_string()
            }
            other => format!("Invalid request body: {}", other.body_text()),
        };
        Self::bad_request(message)
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(message) => Self::bad_request(message),
            Error::MissingCategory => Self::bad_request("Category ID required"),
            Error::UnsupportedType => Self::bad_request(format!(
                "Invalid file type. Only {} files are allowed.",
                ALLOWED_EXTENSIONS.join(", ")
            )),
            Error::TooLarge { limit } => Self::bad_request(format!(
                "File too large. Maximum size is {}.",
                format_file_size(limit).replace(' ', "")
            )),
            Error::InvalidToken => Self::unauthorized("Invalid token"),
            Error::TokenExpired => Self::unauthorized("Token expired"),
            Error::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            Error::Forbidden(message) => Self::forbidden(message),
            Error::NoActiveSubscription => Self::forbidden("Active subscription required"),
            Error::NotFound(message) => Self::not_found(message),
            Error::StorageMissing => Self::not_found("File not found on disk"),
            Error::Conflict(message) => Self::conflict(message),
            e @ (Error::Database(_)
            | Error::Io(_)
            | Error::Session(_)
            | Error::Config(_)
            | Error::Storage(_)) => {
                tracing::error!("Request failed: {e}");
                Self::internal("Internal server error")
            }
        }
    }
}
