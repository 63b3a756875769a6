//! Integration tests for the link API (handlers/links.rs).

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use startpage::{create_router, AppContext, Config};

fn create_test_server() -> TestServer {
    let app = create_router(AppContext::new(Config::in_memory()));
    TestServer::new(app).unwrap()
}

async fn create_link(server: &TestServer, body: serde_json::Value) -> serde_json::Value {
    let response = server.post("/api/links").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_create_link() {
    let server = create_test_server();

    let body = create_link(&server, json!({ "url": "  www.rust-lang.org/learn " })).await;

    assert_eq!(body["url"], "https://www.rust-lang.org/learn");
    assert_eq!(body["title"], "rust-lang.org");
    assert_eq!(body["description"], "");
    assert_eq!(body["favicon"], "https://www.rust-lang.org/favicon.ico");
    assert_eq!(body["is_favorite"], false);
    assert_eq!(body["created_at"], body["updated_at"]);
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_create_link_invalid_url() {
    let server = create_test_server();

    let response = server
        .post("/api/links")
        .json(&json!({ "url": "https://" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "invalid_url");
}

#[tokio::test]
async fn test_create_link_duplicate() {
    let server = create_test_server();
    create_link(&server, json!({ "url": "example.com" })).await;

    let response = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "duplicate_link");
}

#[tokio::test]
async fn test_list_links_in_insertion_order() {
    let server = create_test_server();
    create_link(&server, json!({ "url": "a.com" })).await;
    create_link(&server, json!({ "url": "b.com", "is_favorite": true })).await;
    create_link(&server, json!({ "url": "c.com" })).await;

    let response = server.get("/api/links").await;
    response.assert_status_ok();
    let body: Vec<serde_json::Value> = response.json();
    let urls: Vec<&str> = body.iter().map(|l| l["url"].as_str().unwrap()).collect();
    assert_eq!(urls, vec!["https://a.com", "https://b.com", "https://c.com"]);

    let response = server.get("/api/links/favorites").await;
    response.assert_status_ok();
    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["url"], "https://b.com");
}

#[tokio::test]
async fn test_get_link() {
    let server = create_test_server();
    let created = create_link(&server, json!({ "url": "example.com", "title": "Example" })).await;
    let id = created["id"].as_i64().unwrap();

    let response = server.get(&format!("/api/links/{}", id)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["title"], "Example");

    server.get("/api/links/9999").await.assert_status_not_found();
}

#[tokio::test]
async fn test_lookup_link_by_url() {
    let server = create_test_server();
    create_link(&server, json!({ "url": "example.com" })).await;

    let response = server
        .get("/api/links/lookup")
        .add_query_param("url", "https://example.com")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["url"], "https://example.com");

    server
        .get("/api/links/lookup")
        .add_query_param("url", "https://missing.example.com")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_update_link() {
    let server = create_test_server();
    let created = create_link(&server, json!({ "url": "example.com" })).await;
    let id = created["id"].as_i64().unwrap();

    let response = server
        .put(&format!("/api/links/{}", id))
        .json(&json!({ "title": "Renamed", "description": "  notes  " }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["description"], "notes");
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["created_at"], created["created_at"]);
    assert_ne!(body["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_update_link_to_existing_url() {
    let server = create_test_server();
    create_link(&server, json!({ "url": "a.com" })).await;
    let b = create_link(&server, json!({ "url": "b.com" })).await;

    let response = server
        .put(&format!("/api/links/{}", b["id"]))
        .json(&json!({ "url": "a.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_missing_link() {
    let server = create_test_server();

    server
        .put("/api/links/42")
        .json(&json!({ "title": "x" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_toggle_favorite() {
    let server = create_test_server();
    let created = create_link(&server, json!({ "url": "example.com" })).await;
    let path = format!("/api/links/{}/favorite", created["id"]);

    let body: serde_json::Value = server.put(&path).await.json();
    assert_eq!(body["is_favorite"], true);

    let body: serde_json::Value = server.put(&path).await.json();
    assert_eq!(body["is_favorite"], false);
}

#[tokio::test]
async fn test_delete_link() {
    let server = create_test_server();
    let created = create_link(&server, json!({ "url": "example.com" })).await;
    let path = format!("/api/links/{}", created["id"]);

    server
        .delete(&path)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server.get(&path).await.assert_status_not_found();

    // Deleting again is not an error.
    server
        .delete(&path)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_ids_not_reused_after_delete() {
    let server = create_test_server();
    let first = create_link(&server, json!({ "url": "a.com" })).await;
    server
        .delete(&format!("/api/links/{}", first["id"]))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let second = create_link(&server, json!({ "url": "a.com" })).await;
    assert!(second["id"].as_i64().unwrap() > first["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_health() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["store_open"], false);

    server.get("/api/links").await.assert_status_ok();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["store_open"], true);
}
