mod categories;
mod files;
mod settings;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

/// Admin routes. `upload_limit` replaces the default body limit on the
/// upload route only.
pub fn admin_router(upload_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        // Users and subscriptions
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}/subscription",
            put(users::grant_subscription),
        )
        // Categories
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        // Files
        .route(
            "/upload",
            post(files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/{file_id}", delete(files::delete_file))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
}
