use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_name, validate_page, validate_slug};
use super::{ApiError, ApiResponse, AppState, GenreDto, PageQuery, Paginated};
use crate::domain::access;

#[derive(Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
    pub slug: String,
}

/// GET /genres (public)
pub async fn list_genres(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<GenreDto>>>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;

    let genres = state
        .store()
        .list_genres(query.search.as_deref(), limit, offset)
        .await?;
    let count = state.store().count_genres(query.search.as_deref()).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: genres.into_iter().map(GenreDto::from).collect(),
    })))
}

/// POST /genres (admin)
pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<Json<ApiResponse<GenreDto>>, ApiError> {
    if !access::is_admin(&current.0) {
        return Err(ApiError::forbidden("Administrator access required"));
    }
    validate_name(&payload.name)?;
    validate_slug(&payload.slug)?;

    let genre = state
        .store()
        .create_genre(&payload.name, &payload.slug)
        .await?;

    Ok(Json(ApiResponse::success(GenreDto::from(genre))))
}

/// DELETE /genres/{slug} (admin)
pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !access::is_admin(&current.0) {
        return Err(ApiError::forbidden("Administrator access required"));
    }

    let deleted = state.store().delete_genre_by_slug(&slug).await?;
    if !deleted {
        return Err(ApiError::not_found("Genre", &slug));
    }

    Ok(Json(ApiResponse::success(())))
}
