use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_name, validate_page, validate_year};
use super::{ApiError, ApiResponse, AppState, Paginated, TitleDto};
use crate::db::{NewTitle, TitleFilter, TitleUpdate};
use crate::domain::access;

#[derive(Debug, Deserialize, Default)]
pub struct TitleListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    // double Option: absent = keep, explicit null = clear
    #[serde(default, deserialize_with = "deserialize_patch_field")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_patch_field")]
    pub category: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
}

fn deserialize_patch_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_admin(current: &CurrentUser) -> Result<(), ApiError> {
    if access::is_admin(&current.0) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

/// GET /titles (public)
pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleListQuery>,
) -> Result<Json<ApiResponse<Paginated<TitleDto>>>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;

    let filter = TitleFilter {
        category: query.category,
        genre: query.genre,
        name: query.name,
        year: query.year,
    };

    let titles = state.store().list_titles(&filter, limit, offset).await?;
    let count = state.store().count_titles(&filter).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: titles.into_iter().map(TitleDto::from).collect(),
    })))
}

/// GET /titles/{id} (public)
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    let title = state
        .store()
        .get_title(id)
        .await?
        .ok_or_else(|| ApiError::title_not_found(id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(title))))
}

/// POST /titles (admin)
pub async fn create_title(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    require_admin(&current)?;
    validate_name(&payload.name)?;
    validate_year(payload.year)?;

    let title = state
        .store()
        .create_title(NewTitle {
            name: payload.name,
            year: payload.year,
            description: payload.description,
            category_slug: payload.category,
            genre_slugs: payload.genre,
        })
        .await?;

    Ok(Json(ApiResponse::success(TitleDto::from(title))))
}

/// PATCH /titles/{id} (admin)
pub async fn update_title(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    require_admin(&current)?;

    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(year) = payload.year {
        validate_year(year)?;
    }

    let title = state
        .store()
        .update_title(
            id,
            TitleUpdate {
                name: payload.name,
                year: payload.year,
                description: payload.description,
                category_slug: payload.category,
                genre_slugs: payload.genre,
            },
        )
        .await?
        .ok_or_else(|| ApiError::title_not_found(id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(title))))
}

/// DELETE /titles/{id} (admin)
pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require_admin(&current)?;

    let deleted = state.store().delete_title(id).await?;
    if !deleted {
        return Err(ApiError::title_not_found(id));
    }

    Ok(Json(ApiResponse::success(())))
}
