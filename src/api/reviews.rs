use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_page, validate_score, validate_text};
use super::{ApiError, ApiResponse, AppState, PageQuery, Paginated, ReviewDto};
use crate::db::{NewReview, ReviewUpdate};
use crate::domain::access;
use crate::entities::reviews;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i32,
}

#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i32>,
}

async fn load_review(
    state: &AppState,
    title_id: i32,
    review_id: i32,
) -> Result<reviews::Model, ApiError> {
    if !state.store().title_exists(title_id).await? {
        return Err(ApiError::title_not_found(title_id));
    }

    state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))
}

async fn author_names(
    state: &AppState,
    rows: &[reviews::Model],
) -> Result<HashMap<i32, String>, ApiError> {
    let ids: Vec<i32> = rows.iter().map(|r| r.author_id).collect();
    Ok(state.store().get_usernames_by_ids(&ids).await?)
}

fn to_dto(review: reviews::Model, authors: &HashMap<i32, String>) -> ReviewDto {
    let author = authors
        .get(&review.author_id)
        .cloned()
        .unwrap_or_else(|| "deleted".to_string());
    ReviewDto::from_model(review, author)
}

/// GET /titles/{title_id}/reviews (public)
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<ReviewDto>>>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;

    if !state.store().title_exists(title_id).await? {
        return Err(ApiError::title_not_found(title_id));
    }

    let rows = state.store().list_reviews(title_id, limit, offset).await?;
    let count = state.store().count_reviews(title_id).await?;
    let authors = author_names(&state, &rows).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: rows.into_iter().map(|r| to_dto(r, &authors)).collect(),
    })))
}

/// GET /titles/{title_id}/reviews/{review_id} (public)
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let review = load_review(&state, title_id, review_id).await?;
    let authors = author_names(&state, std::slice::from_ref(&review)).await?;

    Ok(Json(ApiResponse::success(to_dto(review, &authors))))
}

/// POST /titles/{title_id}/reviews (authenticated)
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(title_id): Path<i32>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    validate_text(&payload.text)?;
    validate_score(payload.score)?;

    if !state.store().title_exists(title_id).await? {
        return Err(ApiError::title_not_found(title_id));
    }

    let review = state
        .store()
        .create_review(NewReview {
            title_id,
            author_id: current.0.id,
            text: payload.text,
            score: payload.score,
        })
        .await?;

    Ok(Json(ApiResponse::success(ReviewDto::from_model(
        review,
        current.0.username,
    ))))
}

/// PATCH /titles/{title_id}/reviews/{review_id} (author or staff)
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    if let Some(text) = &payload.text {
        validate_text(text)?;
    }
    if let Some(score) = payload.score {
        validate_score(score)?;
    }

    let review = load_review(&state, title_id, review_id).await?;

    if !access::can_modify_content(&current.0, review.author_id) {
        return Err(ApiError::forbidden("You cannot modify this review"));
    }

    let review = state
        .store()
        .update_review(
            review,
            ReviewUpdate {
                text: payload.text,
                score: payload.score,
            },
        )
        .await?;

    let authors = author_names(&state, std::slice::from_ref(&review)).await?;
    Ok(Json(ApiResponse::success(to_dto(review, &authors))))
}

/// DELETE /titles/{title_id}/reviews/{review_id} (author or staff)
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let review = load_review(&state, title_id, review_id).await?;

    if !access::can_modify_content(&current.0, review.author_id) {
        return Err(ApiError::forbidden("You cannot delete this review"));
    }

    state.store().delete_review(review).await?;

    Ok(Json(ApiResponse::success(())))
}
