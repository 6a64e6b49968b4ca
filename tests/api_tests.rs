use axum::http::StatusCode;
use serde_json::json;

use kurate::entities::users::Role;

mod common;
use common::spawn_app;

#[tokio::test]
async fn anonymous_reads_are_open_but_writes_are_rejected() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/v1/titles", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/categories", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            "/api/v1/categories",
            &json!({"name": "Movies", "slug": "movies"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_issues_code_and_token_flow_works() {
    let app = spawn_app().await;

    let (status, body) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "alice", "email": "alice@example.com"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let user = app
        .store
        .get_user_by_username("alice")
        .await
        .unwrap()
        .expect("signup should create the account");

    // wrong code is rejected
    let (status, _) = app
        .post_json(
            "/api/v1/auth/token",
            &json!({"username": "alice", "confirmation_code": "nope"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown username is a 404, not a 400
    let (status, _) = app
        .post_json(
            "/api/v1/auth/token",
            &json!({"username": "nobody", "confirmation_code": "whatever"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post_json(
            "/api/v1/auth/token",
            &json!({"username": "alice", "confirmation_code": user.confirmation_code}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn signup_is_idempotent_for_same_pair_but_rejects_collisions() {
    let app = spawn_app().await;

    let payload = json!({"username": "bob", "email": "bob@example.com"});
    let (status, _) = app.post_json("/api/v1/auth/signup", &payload, None).await;
    assert_eq!(status, StatusCode::OK);

    let code_before = app
        .store
        .get_user_by_username("bob")
        .await
        .unwrap()
        .unwrap()
        .confirmation_code;

    // exact same pair: re-sends the stored code instead of failing
    let (status, _) = app.post_json("/api/v1/auth/signup", &payload, None).await;
    assert_eq!(status, StatusCode::OK);

    let code_after = app
        .store
        .get_user_by_username("bob")
        .await
        .unwrap()
        .unwrap()
        .confirmation_code;
    assert_eq!(code_before, code_after);

    // same username, different email
    let (status, _) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "bob", "email": "other@example.com"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // same email, different username
    let (status, _) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "robert", "email": "bob@example.com"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reserved_and_malformed_usernames_are_rejected() {
    let app = spawn_app().await;

    let (status, _) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "me", "email": "me@example.com"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "has spaces", "email": "x@example.com"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            "/api/v1/auth/signup",
            &json!({"username": "valid", "email": "not-an-email"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = spawn_app().await;
    let admin = app.user_with_token("boss", Role::Admin).await;
    let user = app.user_with_token("pleb", Role::User).await;

    let (status, _) = app.get("/api/v1/users", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/v1/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);

    let (status, body) = app
        .post_json(
            "/api/v1/users",
            &json!({
                "username": "mod",
                "email": "mod@example.com",
                "role": "moderator"
            }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "moderator");

    let (status, body) = app
        .patch_json(
            "/api/v1/users/pleb",
            &json!({"role": "moderator", "bio": "promoted"}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "moderator");
    assert_eq!(body["data"]["bio"], "promoted");

    let (status, _) = app.delete("/api/v1/users/mod", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/users/mod", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_list_count_respects_search() {
    let app = spawn_app().await;
    let admin = app.user_with_token("boss", Role::Admin).await;
    app.user_with_token("alice", Role::User).await;
    app.user_with_token("alina", Role::User).await;

    let (status, body) = app.get("/api/v1/users?search=ali", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["count"], 2);

    let (status, body) = app.get("/api/v1/users?search=alice", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn profile_update_cannot_change_role() {
    let app = spawn_app().await;
    let token = app.user_with_token("carol", Role::User).await;

    let (status, body) = app
        .patch_json(
            "/api/v1/users/me",
            &json!({"bio": "I review things", "role": "admin"}),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bio"], "I review things");
    // the role field is not part of the self-service payload
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn overlong_profile_names_are_rejected() {
    let app = spawn_app().await;
    let token = app.user_with_token("carol", Role::User).await;

    let (status, _) = app
        .patch_json(
            "/api/v1/users/me",
            &json!({"first_name": "c".repeat(151)}),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch_json(
            "/api/v1/users/me",
            &json!({"first_name": "Carol", "last_name": "c".repeat(150)}),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Carol");
}

#[tokio::test]
async fn garbage_bearer_token_is_unauthorized() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/v1/users/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
