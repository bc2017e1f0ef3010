//! Video metadata endpoints and static file serving.

mod common;

use axum::http::header::CACHE_CONTROL;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{bare_request, json_request, spawn_app};

#[tokio::test]
async fn create_list_get() {
    let app = spawn_app().await;
    let (user_id, token, _) = app.login_new_user("ada@example.com").await;

    let first = app.create_video(&token, "first").await;
    let second = app.create_video(&token, "second").await;

    let (status, body) = app
        .send(bare_request(Method::GET, &format!("/api/videos/{first}"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "first");
    assert_eq!(body["description"], "test clip");
    assert_eq!(body["user_id"], user_id.as_str());
    assert!(body["video_url"].is_null());
    assert!(body["thumbnail_url"].is_null());

    let (status, body) = app
        .send(bare_request(Method::GET, "/api/videos", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn list_is_scoped_to_caller() {
    let app = spawn_app().await;
    let (_, ada, _) = app.login_new_user("ada@example.com").await;
    let (_, bob, _) = app.login_new_user("bob@example.com").await;
    app.create_video(&ada, "ada's").await;

    let (_, body) = app.send(bare_request(Method::GET, "/api/videos", Some(&bob))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn create_requires_title() {
    let app = spawn_app().await;
    let (_, token, _) = app.login_new_user("ada@example.com").await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/videos",
            Some(&token),
            &json!({"title": "   ", "description": "x"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title is required");
}

#[tokio::test]
async fn delete_by_owner_then_not_found() {
    let app = spawn_app().await;
    let (_, token, _) = app.login_new_user("ada@example.com").await;
    let id = app.create_video(&token, "short-lived").await;
    let uri = format!("/api/videos/{id}");

    let (status, _) = app.send(bare_request(Method::DELETE, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(bare_request(Method::GET, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Video not found");

    let (status, _) = app.send(bare_request(Method::DELETE, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_owner_delete_is_unauthorized_not_not_found() {
    let app = spawn_app().await;
    let (_, ada, _) = app.login_new_user("ada@example.com").await;
    let (_, bob, _) = app.login_new_user("bob@example.com").await;
    let id = app.create_video(&ada, "ada's").await;
    let uri = format!("/api/videos/{id}");

    let (status, body) = app.send(bare_request(Method::DELETE, &uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.send(bare_request(Method::GET, &uri, Some(&ada))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_video_id_is_bad_request() {
    let app = spawn_app().await;
    let (_, token, _) = app.login_new_user("ada@example.com").await;

    let (status, body) = app
        .send(bare_request(Method::GET, "/api/videos/not-a-uuid", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid video ID");
}

#[tokio::test]
async fn static_dirs_carry_cache_headers() {
    let app = spawn_app().await;
    std::fs::write(app.app_dir.path().join("index.html"), "<html></html>").unwrap();
    std::fs::write(app.assets_dir.path().join("thumb.png"), b"png").unwrap();

    let resp = app
        .router
        .clone()
        .oneshot(bare_request(Method::GET, "/app/index.html", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CACHE_CONTROL], "no-store");

    let resp = app
        .router
        .clone()
        .oneshot(bare_request(Method::GET, "/assets/thumb.png", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CACHE_CONTROL], "max-age=3600");
}
