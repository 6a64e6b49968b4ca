use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::{validate_email, validate_username};
use super::{ApiError, ApiResponse, AppState};
use crate::entities::users;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// The authenticated caller, inserted into request extensions by the auth
/// middleware and read back by handlers.
#[derive(Clone)]
pub struct CurrentUser(pub users::Model);

// ============================================================================
// Middleware
// ============================================================================

/// Requires a valid `Authorization: Bearer <jwt>` header, loads the account
/// it names, and makes it available to the handler as [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

    let claims = state
        .shared
        .tokens
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let user_id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let user = state
        .store()
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Register an account (or re-request the code for an existing one) and
/// email the confirmation code.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse<SignupResponse>>, ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let user = state
        .store()
        .signup_user(&payload.username, &payload.email)
        .await?;

    state.shared.mailer.send_confirmation_code(
        &user.email,
        &user.username,
        &user.confirmation_code,
    );

    Ok(Json(ApiResponse::success(SignupResponse {
        username: user.username,
        email: user.email,
    })))
}

/// POST /auth/token
/// Exchange (username, confirmation code) for a bearer token.
pub async fn token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.confirmation_code.is_empty() {
        return Err(ApiError::validation("Confirmation code is required"));
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &payload.username))?;

    if user.confirmation_code != payload.confirmation_code {
        return Err(ApiError::validation("Invalid confirmation code"));
    }

    let token = state
        .shared
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    tracing::info!("Issued token for '{}'", user.username);

    Ok(Json(ApiResponse::success(TokenResponse { token })))
}
