use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::auth::RequireAuth;
use crate::catalog::Download;
use crate::server::AppState;
use crate::server::dto::{CategoriesResponse, CategoryResponse};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_categories(
    RequireAuth(_session): RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.catalog.list_categories()?;

    Ok(Json(ApiResponse::success(CategoriesResponse {
        categories: categories.iter().map(CategoryResponse::from).collect(),
    })))
}

pub async fn download(
    RequireAuth(session): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .catalog
        .resolve_download(&state.ledger, &session, &file_id)
        .await?;
    let disposition = content_disposition(download.suggested_filename());
    let Download { file, reader, size } = download;

    info!(username = %session.username, file_id = %file.id, "Download started");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Content-Type-Options", "nosniff");

    if !file.sha256.is_empty() {
        builder = builder.header(header::ETAG, format!("\"{}\"", file.sha256));
    }

    builder
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|_| ApiError::internal("Failed to build download response"))
}

/// `attachment` disposition with an ASCII fallback and the exact name
/// percent-encoded in `filename*`.
fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .collect();
    let fallback = fallback.trim();
    let fallback = if fallback.is_empty() { "download" } else { fallback };

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(original_name)
    )
}
