use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod auth;
mod categories;
mod comments;
mod error;
mod genres;
mod observability;
mod reviews;
mod titles;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn new(shared: Arc<SharedState>) -> Arc<Self> {
        Arc::new(Self { shared })
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.shared.config.read().await;
        config.server.cors_allowed_origins.clone()
    };

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_protected_router(state.clone()))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Anonymous surface: registration, token exchange, and all reads of the
/// catalog and its reviews/comments.
fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/token", post(auth::token))
        .route("/categories", get(categories::list_categories))
        .route("/genres", get(genres::list_genres))
        .route("/titles", get(titles::list_titles))
        .route("/titles/{id}", get(titles::get_title))
        .route("/titles/{title_id}/reviews", get(reviews::list_reviews))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment),
        )
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/me", get(users::get_profile))
        .route("/users/me", patch(users::update_profile))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}", patch(users::update_user))
        .route("/users/{username}", delete(users::delete_user))
        .route("/categories", post(categories::create_category))
        .route("/categories/{slug}", delete(categories::delete_category))
        .route("/genres", post(genres::create_genre))
        .route("/genres/{slug}", delete(genres::delete_genre))
        .route("/titles", post(titles::create_title))
        .route("/titles/{id}", patch(titles::update_title))
        .route("/titles/{id}", delete(titles::delete_title))
        .route("/titles/{title_id}/reviews", post(reviews::create_review))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            patch(reviews::update_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            delete(reviews::delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            patch(comments::update_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
