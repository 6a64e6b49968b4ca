use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_name, validate_page, validate_slug};
use super::{ApiError, ApiResponse, AppState, CategoryDto, PageQuery, Paginated};
use crate::domain::access;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
}

/// GET /categories (public)
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<CategoryDto>>>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;

    let categories = state
        .store()
        .list_categories(query.search.as_deref(), limit, offset)
        .await?;
    let count = state.store().count_categories(query.search.as_deref()).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: categories.into_iter().map(CategoryDto::from).collect(),
    })))
}

/// POST /categories (admin)
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    if !access::is_admin(&current.0) {
        return Err(ApiError::forbidden("Administrator access required"));
    }
    validate_name(&payload.name)?;
    validate_slug(&payload.slug)?;

    let category = state
        .store()
        .create_category(&payload.name, &payload.slug)
        .await?;

    Ok(Json(ApiResponse::success(CategoryDto::from(category))))
}

/// DELETE /categories/{slug} (admin)
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !access::is_admin(&current.0) {
        return Err(ApiError::forbidden("Administrator access required"));
    }

    let deleted = state.store().delete_category_by_slug(&slug).await?;
    if !deleted {
        return Err(ApiError::not_found("Category", &slug));
    }

    Ok(Json(ApiResponse::success(())))
}
