use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    CategoriesResponse, CategoryResponse, CreateCategoryRequest, CreatedCategoryResponse,
};
use crate::server::response::{ApiError, ApiJson, ApiResponse};

pub async fn list_categories(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.catalog.list_categories()?;

    Ok(Json(ApiResponse::success(CategoriesResponse {
        categories: categories.iter().map(CategoryResponse::from).collect(),
    })))
}

pub async fn create_category(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.catalog.create_category(&req.name)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Category created successfully",
            CreatedCategoryResponse {
                category_id: category.id,
            },
        )),
    ))
}
