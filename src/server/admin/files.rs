use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, info};

use crate::auth::RequireAdmin;
use crate::catalog::{DiskRemoval, PendingUpload};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{FileResponse, UploadedFileResponse};
use crate::server::response::{ApiError, ApiResponse};

fn multipart_error(e: MultipartError, limit: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::TooLarge { limit }.into();
    }
    ApiError::bad_request(format!("Failed to read multipart: {}", e.body_text()))
}

/// Multipart upload with a `file` part and a `categoryId` part. The file is
/// streamed to staging as it arrives and only recorded once both are known.
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let limit = state.catalog.max_file_size();

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if content_length.is_some_and(|len| len > state.upload_body_limit() as u64) {
        return Err(Error::TooLarge { limit }.into());
    }

    let mut upload: Option<PendingUpload> = None;
    let mut category_id: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                if upload.is_some() {
                    return Err(ApiError::bad_request("Only one file may be uploaded at a time"));
                }

                let file_name = field.file_name().unwrap_or_default().to_string();
                let mut pending = state.catalog.begin_upload(&file_name, None).await?;

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error(e, limit))?
                {
                    pending.write(&chunk).await?;
                }

                debug!(
                    name = %pending.original_name(),
                    stored_name = %pending.stored_name(),
                    bytes = pending.received(),
                    "File part staged"
                );

                upload = Some(pending);
            }
            "categoryId" => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                category_id = Some(value);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let file = state
        .catalog
        .commit_upload(upload, category_id.as_deref())
        .await?;

    info!(admin = %admin.username, file_id = %file.id, "Upload accepted");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "File uploaded successfully",
            UploadedFileResponse {
                file: FileResponse::from(&file),
            },
        )),
    ))
}

/// Deletes the catalog row even when the disk object could not be removed.
pub async fn delete_file(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removal = state.catalog.delete_file(&file_id).await?;

    let message = match removal {
        DiskRemoval::Removed | DiskRemoval::AlreadyMissing => "File deleted successfully",
        DiskRemoval::Failed => "File deleted successfully (disk cleanup pending)",
    };

    info!(admin = %admin.username, file_id = %file_id, ?removal, "Delete handled");

    Ok(Json(ApiResponse::message(message)))
}
