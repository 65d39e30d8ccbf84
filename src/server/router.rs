use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Json, Router, routing::get};

use super::admin::admin_router;
use super::response::{ApiError, ApiResponse, Empty};
use super::user::user_router;
use crate::auth::{Authenticator, SessionKeys};
use crate::catalog::Catalog;
use crate::storage::FileStorage;
use crate::store::Store;
use crate::subscription::SubscriptionLedger;

/// Room for multipart boundaries and the non-file fields of an upload.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Authenticator,
    pub ledger: SubscriptionLedger,
    pub catalog: Catalog,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        sessions: SessionKeys,
        data_dir: &Path,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            auth: Authenticator::new(store.clone(), sessions),
            ledger: SubscriptionLedger::new(store.clone()),
            catalog: Catalog::new(store.clone(), FileStorage::new(data_dir), max_upload_bytes),
            store,
        }
    }

    /// Request body ceiling for the upload route.
    #[must_use]
    pub fn upload_body_limit(&self) -> usize {
        let limit = self.catalog.max_file_size().saturating_add(MULTIPART_OVERHEAD);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

async fn health() -> Json<ApiResponse<Empty>> {
    Json(ApiResponse::message("Server is running"))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(user_router())
        .nest("/admin", admin_router(state.upload_body_limit()));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
