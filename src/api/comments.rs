use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_page, validate_text};
use super::{ApiError, ApiResponse, AppState, CommentDto, PageQuery, Paginated};
use crate::db::repositories::comment::NewComment;
use crate::domain::access;
use crate::entities::comments;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub text: String,
}

/// Both path segments are checked, so a comment can only be reached through
/// the review (and title) it belongs to.
async fn check_review_path(state: &AppState, title_id: i32, review_id: i32) -> Result<(), ApiError> {
    if !state.store().title_exists(title_id).await? {
        return Err(ApiError::title_not_found(title_id));
    }

    if state.store().get_review(title_id, review_id).await?.is_none() {
        return Err(ApiError::not_found("Review", review_id));
    }

    Ok(())
}

async fn author_names(
    state: &AppState,
    rows: &[comments::Model],
) -> Result<HashMap<i32, String>, ApiError> {
    let ids: Vec<i32> = rows.iter().map(|c| c.author_id).collect();
    Ok(state.store().get_usernames_by_ids(&ids).await?)
}

fn to_dto(comment: comments::Model, authors: &HashMap<i32, String>) -> CommentDto {
    let author = authors
        .get(&comment.author_id)
        .cloned()
        .unwrap_or_else(|| "deleted".to_string());
    CommentDto::from_model(comment, author)
}

/// GET /titles/{title_id}/reviews/{review_id}/comments (public)
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<CommentDto>>>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;
    check_review_path(&state, title_id, review_id).await?;

    let rows = state.store().list_comments(review_id, limit, offset).await?;
    let count = state.store().count_comments(review_id).await?;
    let authors = author_names(&state, &rows).await?;

    Ok(Json(ApiResponse::success(Paginated {
        count,
        results: rows.into_iter().map(|c| to_dto(c, &authors)).collect(),
    })))
}

/// GET /titles/{title_id}/reviews/{review_id}/comments/{comment_id} (public)
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    check_review_path(&state, title_id, review_id).await?;

    let comment = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    let authors = author_names(&state, std::slice::from_ref(&comment)).await?;
    Ok(Json(ApiResponse::success(to_dto(comment, &authors))))
}

/// POST /titles/{title_id}/reviews/{review_id}/comments (authenticated)
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    validate_text(&payload.text)?;
    check_review_path(&state, title_id, review_id).await?;

    let comment = state
        .store()
        .create_comment(NewComment {
            review_id,
            author_id: current.0.id,
            text: payload.text,
        })
        .await?;

    Ok(Json(ApiResponse::success(CommentDto::from_model(
        comment,
        current.0.username,
    ))))
}

/// PATCH /titles/{title_id}/reviews/{review_id}/comments/{comment_id} (author or staff)
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    validate_text(&payload.text)?;
    check_review_path(&state, title_id, review_id).await?;

    let comment = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    if !access::can_modify_content(&current.0, comment.author_id) {
        return Err(ApiError::forbidden("You cannot modify this comment"));
    }

    let comment = state
        .store()
        .update_comment_text(comment, payload.text)
        .await?;

    let authors = author_names(&state, std::slice::from_ref(&comment)).await?;
    Ok(Json(ApiResponse::success(to_dto(comment, &authors))))
}

/// DELETE /titles/{title_id}/reviews/{review_id}/comments/{comment_id} (author or staff)
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    check_review_path(&state, title_id, review_id).await?;

    let comment = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    if !access::can_modify_content(&current.0, comment.author_id) {
        return Err(ApiError::forbidden("You cannot delete this comment"));
    }

    state.store().delete_comment(comment.id).await?;

    Ok(Json(ApiResponse::success(())))
}
