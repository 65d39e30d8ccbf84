mod files;
mod session;
mod settings;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Sessions
        .route("/login", post(session::login))
        .route("/register", post(session::register))
        .route("/verify-token", post(session::verify_token))
        // Catalog
        .route("/categories", get(files::list_categories))
        .route("/download/{file_id}", get(files::download))
        // Branding
        .route("/settings", get(settings::get_settings))
}
