use axum::http::StatusCode;
use serde_json::json;

use kurate::entities::users::Role;

mod common;
use common::{TestApp, spawn_app};

async fn seed_title(app: &TestApp, admin: &str) -> i64 {
    let (status, _) = app
        .post_json(
            "/api/v1/categories",
            &json!({"name": "Movies", "slug": "movies"}),
            Some(admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/api/v1/titles",
            &json!({"name": "Dune", "year": 2021, "category": "movies", "genre": []}),
            Some(admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["id"].as_i64().unwrap()
}

async fn title_rating(app: &TestApp, title_id: i64) -> serde_json::Value {
    let (status, body) = app.get(&format!("/api/v1/titles/{title_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["rating"].clone()
}

#[tokio::test]
async fn rating_follows_review_lifecycle() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let bob = app.user_with_token("bob", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    assert!(title_rating(&app, title_id).await.is_null());

    let (status, body) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Loved the sandworms", "score": 8}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["author"], "alice");
    let alice_review = body["data"]["id"].as_i64().unwrap();

    assert_eq!(title_rating(&app, title_id).await, json!(8));

    let (status, body) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Too much sand", "score": 6}),
            Some(&bob),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let bob_review = body["data"]["id"].as_i64().unwrap();

    // mean(8, 6) = 7
    assert_eq!(title_rating(&app, title_id).await, json!(7));

    // bob reconsiders: mean(8, 8) = 8
    let (status, _) = app
        .patch_json(
            &format!("/api/v1/titles/{title_id}/reviews/{bob_review}"),
            &json!({"score": 8}),
            Some(&bob),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(title_rating(&app, title_id).await, json!(8));

    // removing every review clears the rating entirely
    let (status, _) = app
        .delete(
            &format!("/api/v1/titles/{title_id}/reviews/{alice_review}"),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(
            &format!("/api/v1/titles/{title_id}/reviews/{bob_review}"),
            Some(&bob),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(title_rating(&app, title_id).await.is_null());
}

#[tokio::test]
async fn rating_rounds_midpoints_to_even() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let bob = app.user_with_token("bob", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Nearly perfect", "score": 8}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Masterpiece", "score": 9}),
            Some(&bob),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // mean(8, 9) = 8.5, ties round to even
    assert_eq!(title_rating(&app, title_id).await, json!(8));
}

#[tokio::test]
async fn overlong_review_text_is_rejected() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "x".repeat(241), "score": 5}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "x".repeat(240), "score": 5}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn one_review_per_title_per_author() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "First impressions", "score": 9}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Second thoughts", "score": 3}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the rejected duplicate must not have moved the rating
    assert_eq!(title_rating(&app, title_id).await, json!(9));
}

#[tokio::test]
async fn score_bounds_are_enforced() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    for score in [0, 11, -5] {
        let (status, _) = app
            .post_json(
                &format!("/api/v1/titles/{title_id}/reviews"),
                &json!({"text": "Out of range", "score": score}),
                Some(&alice),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "score {score} should fail");
    }
}

#[tokio::test]
async fn review_moderation_rules() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let bob = app.user_with_token("bob", Role::User).await;
    let moderator = app.user_with_token("mod", Role::Moderator).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, body) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Mine", "score": 7}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let review_id = body["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}");

    // another plain user cannot touch it
    let (status, _) = app
        .patch_json(&review_uri, &json!({"score": 1}), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&review_uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // a moderator can
    let (status, body) = app
        .patch_json(&review_uri, &json!({"text": "Cleaned up"}), Some(&moderator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Cleaned up");

    let (status, _) = app.delete(&review_uri, Some(&moderator)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&review_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_under_missing_title_are_not_found() {
    let app = spawn_app().await;
    let alice = app.user_with_token("alice", Role::User).await;

    let (status, _) = app.get("/api/v1/titles/999/reviews", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post_json(
            "/api/v1/titles/999/reviews",
            &json!({"text": "Ghost", "score": 5}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_flow_and_permissions() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let bob = app.user_with_token("bob", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, body) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Great movie", "score": 9}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let review_id = body["data"]["id"].as_i64().unwrap();
    let comments_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments");

    // anonymous cannot comment
    let (status, _) = app
        .post_json(&comments_uri, &json!({"text": "Agreed"}), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json(&comments_uri, &json!({"text": "Agreed!"}), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["author"], "bob");
    let comment_id = body["data"]["id"].as_i64().unwrap();
    let comment_uri = format!("{comments_uri}/{comment_id}");

    // anonymous can read
    let (status, body) = app.get(&comments_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);

    // only the author or staff may edit
    let (status, _) = app
        .patch_json(&comment_uri, &json!({"text": "hijacked"}), Some(&alice))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch_json(&comment_uri, &json!({"text": "Agreed, mostly"}), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Agreed, mostly");

    // empty text is rejected
    let (status, _) = app
        .patch_json(&comment_uri, &json!({"text": "   "}), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&comment_uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&comment_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_title_cascades_to_reviews() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    let alice = app.user_with_token("alice", Role::User).await;
    let title_id = seed_title(&app, &admin).await;

    let (status, body) = app
        .post_json(
            &format!("/api/v1/titles/{title_id}/reviews"),
            &json!({"text": "Doomed", "score": 5}),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let review_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .delete(&format!("/api/v1/titles/{title_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let review = app
        .store
        .get_review(title_id as i32, review_id as i32)
        .await
        .unwrap();
    assert!(review.is_none());
}
