use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use kurate::api::AppState;
use kurate::config::Config;
use kurate::db::{NewUser, Store};
use kurate::entities::users::Role;
use kurate::state::SharedState;

/// Router plus direct store access for seeding fixtures.
pub struct TestApp {
    pub router: Router,
    pub store: Store,
}

pub async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    // A single pooled connection, otherwise every connection would get its
    // own in-memory database.
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store");

    let shared = SharedState::with_store(config, store.clone()).expect("Failed to build state");
    let router = kurate::api::router(AppState::new(Arc::new(shared))).await;

    TestApp { router, store }
}

impl TestApp {
    /// Create an account directly and exchange its confirmation code for a
    /// bearer token through the real endpoint.
    pub async fn user_with_token(&self, username: &str, role: Role) -> String {
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: None,
                last_name: None,
                bio: None,
                role,
            })
            .await
            .expect("Failed to seed user");

        let body = self
            .post_json(
                "/api/v1/auth/token",
                &serde_json::json!({
                    "username": user.username,
                    "confirmation_code": user.confirmation_code,
                }),
                None,
            )
            .await;

        assert_eq!(body.0, StatusCode::OK, "token exchange failed: {:?}", body.1);
        body.1["data"]["token"]
            .as_str()
            .expect("token missing from response")
            .to_string()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let request = with_auth(Request::builder().uri(uri), token)
            .body(Body::empty())
            .unwrap();
        to_json(self.router.clone().oneshot(request).await.unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        self.send_json("POST", uri, body, token).await
    }

    pub async fn patch_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        self.send_json("PATCH", uri, body, token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let request = with_auth(Request::builder().method("DELETE").uri(uri), token)
            .body(Body::empty())
            .unwrap();
        to_json(self.router.clone().oneshot(request).await.unwrap()).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: &serde_json::Value,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let request = with_auth(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json"),
            token,
        )
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();

        to_json(self.router.clone().oneshot(request).await.unwrap()).await
    }
}

fn with_auth(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("Authorization", format!("Bearer {token}")),
        None => builder,
    }
}

async fn to_json(response: Response<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
