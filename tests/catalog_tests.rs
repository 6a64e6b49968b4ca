use axum::http::StatusCode;
use serde_json::json;

use kurate::entities::users::Role;

mod common;
use common::{TestApp, spawn_app};

async fn seed_catalog(app: &TestApp, admin: &str) {
    for (name, slug) in [("Movies", "movies"), ("Books", "books")] {
        let (status, _) = app
            .post_json(
                "/api/v1/categories",
                &json!({"name": name, "slug": slug}),
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    for (name, slug) in [("Science Fiction", "sci-fi"), ("Drama", "drama")] {
        let (status, _) = app
            .post_json(
                "/api/v1/genres",
                &json!({"name": name, "slug": slug}),
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn catalog_writes_require_admin() {
    let app = spawn_app().await;
    let user = app.user_with_token("plain", Role::User).await;
    let moderator = app.user_with_token("mod", Role::Moderator).await;

    for token in [&user, &moderator] {
        let (status, _) = app
            .post_json(
                "/api/v1/categories",
                &json!({"name": "Movies", "slug": "movies"}),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn title_crud_with_nested_refs() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    seed_catalog(&app, &admin).await;

    let (status, body) = app
        .post_json(
            "/api/v1/titles",
            &json!({
                "name": "Dune",
                "year": 2021,
                "description": "Spice and sand",
                "category": "movies",
                "genre": ["sci-fi", "drama"]
            }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let title_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"]["slug"], "movies");
    assert_eq!(body["data"]["genre"].as_array().unwrap().len(), 2);
    assert!(body["data"]["rating"].is_null());

    // unknown slugs are validation errors
    let (status, _) = app
        .post_json(
            "/api/v1/titles",
            &json!({"name": "Bad", "year": 2020, "category": "nope", "genre": []}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // future years are rejected
    let (status, _) = app
        .post_json(
            "/api/v1/titles",
            &json!({"name": "Sequel", "year": 3000, "genre": []}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch_json(
            &format!("/api/v1/titles/{title_id}"),
            &json!({"genre": ["drama"], "category": null}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["genre"].as_array().unwrap().len(), 1);
    assert!(body["data"]["category"].is_null());

    let (status, _) = app
        .delete(&format!("/api/v1/titles/{title_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/v1/titles/{title_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn title_list_filters() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    seed_catalog(&app, &admin).await;

    for (name, year, category, genres) in [
        ("Dune", 2021, "movies", vec!["sci-fi"]),
        ("Dune (novel)", 1965, "books", vec!["sci-fi"]),
        ("Heat", 1995, "movies", vec!["drama"]),
    ] {
        let (status, _) = app
            .post_json(
                "/api/v1/titles",
                &json!({"name": name, "year": year, "category": category, "genre": genres}),
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get("/api/v1/titles?category=movies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/v1/titles?genre=sci-fi", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/v1/titles?year=1965", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"][0]["name"], "Dune (novel)");

    let (status, body) = app.get("/api/v1/titles?name=Dune", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .get("/api/v1/titles?genre=sci-fi&category=books", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_slugs_are_validation_errors() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;

    let payload = json!({"name": "Movies", "slug": "movies"});
    let (status, _) = app
        .post_json("/api/v1/categories", &payload, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json("/api/v1/categories", &payload, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // slug charset enforced
    let (status, _) = app
        .post_json(
            "/api/v1/genres",
            &json!({"name": "Bad", "slug": "Not A Slug"}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_category_clears_title_link() {
    let app = spawn_app().await;
    let admin = app.user_with_token("admin", Role::Admin).await;
    seed_catalog(&app, &admin).await;

    let (status, body) = app
        .post_json(
            "/api/v1/titles",
            &json!({"name": "Heat", "year": 1995, "category": "movies", "genre": []}),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let title_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .delete("/api/v1/categories/movies", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/api/v1/titles/{title_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["category"].is_null());
}
