use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_email, validate_page, validate_person_name, validate_username};
use super::{ApiError, ApiResponse, AppState, PageQuery, Paginated, UserDto};
use crate::db::{NewUser, UserUpdate};
use crate::domain::access;
use crate::entities::users::Role;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// Profile self-service payload. Role is deliberately absent: nobody
/// promotes themselves.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

fn validate_person_names(
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(name) = first_name {
        validate_person_name(name)?;
    }
    if let Some(name) = last_name {
        validate_person_name(name)?;
    }
    Ok(())
}

fn require_admin(current: &CurrentUser) -> Result<(), ApiError> {
    if access::is_admin(&current.0) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

/// GET /users (admin)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<UserDto>>>, ApiError> {
    require_admin(&current)?;
    let (limit, offset) = validate_page(query.limit, query.offset)?;

    let users = state
        .store()
        .list_users(query.search.as_deref(), limit, offset)
        .await?;
    let count = state.store().count_users(query.search.as_deref()).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: users.into_iter().map(UserDto::from).collect(),
    })))
}

/// POST /users (admin)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_admin(&current)?;
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_person_names(payload.first_name.as_deref(), payload.last_name.as_deref())?;

    let user = state
        .store()
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            bio: payload.bio,
            role: payload.role.unwrap_or_default(),
        })
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /users/{username} (admin)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_admin(&current)?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PATCH /users/{username} (admin)
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_admin(&current)?;

    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    validate_person_names(payload.first_name.as_deref(), payload.last_name.as_deref())?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;

    let user = state
        .store()
        .update_user(
            user,
            UserUpdate {
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
                bio: payload.bio,
                role: payload.role,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /users/{username} (admin)
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require_admin(&current)?;

    let deleted = state.store().delete_user_by_username(&username).await?;
    if !deleted {
        return Err(ApiError::not_found("User", &username));
    }

    Ok(Json(ApiResponse::success(())))
}

/// GET /users/me
pub async fn get_profile(
    Extension(current): Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(current.0)))
}

/// PATCH /users/me
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    validate_person_names(payload.first_name.as_deref(), payload.last_name.as_deref())?;

    let user = state
        .store()
        .update_user(
            current.0,
            UserUpdate {
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
                bio: payload.bio,
                role: None,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}
