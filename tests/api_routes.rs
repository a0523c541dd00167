mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_reports_ok_with_an_in_memory_store() {
    let app = common::test_app();
    app.state.set_bound_port(3005);

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["port"], 3005);
    assert_eq!(body["database"]["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let app = common::test_app();
    app.create_user("admin", true).await;

    let (status, body) = app
        .send(Method::POST, "/api/login", None, Some(json!({ "username": "admin", "password": "admin-password" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "admin");
    assert!(body["user"].get("password").is_none());

    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = app.send(Method::GET, "/api/current-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_admin"], true);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = common::test_app();
    app.create_user("admin", true).await;

    let (status, body) = app
        .send(Method::POST, "/api/login", None, Some(json!({ "username": "admin", "password": "wrong" })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn current_user_is_null_without_a_token() {
    let app = common::test_app();

    let (status, body) = app.send(Method::GET, "/api/current-user", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = common::test_app();
    let user = app.create_user("leaver", false).await;
    let token = app.token_for(&user);

    let (status, _) = app.send(Method::POST, "/api/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/api/current-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());

    let (status, _) = app.send(Method::POST, "/api/card-requests", Some(&token), Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn card_writes_require_an_admin() {
    let app = common::test_app();
    let user = app.create_user("regular", false).await;
    let admin = app.create_user("admin", true).await;
    let card = json!({ "title": "Docs" });

    let (status, _) = app.send(Method::POST, "/api/cards", None, Some(card.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::POST, "/api/cards", Some(&app.token_for(&user)), Some(card.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::POST, "/api/cards", Some(&app.token_for(&admin)), Some(card)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Docs");
    assert_eq!(body["tag_ids"], json!([]));

    let (status, body) = app.send(Method::GET, "/api/cards", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn card_listing_accepts_search_and_tag_filters() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;
    let token = app.token_for(&admin);

    let (_, tag) = app.send(Method::POST, "/api/tags", Some(&token), Some(json!({ "name": "rust" }))).await;
    let tag_id = tag["id"].as_i64().unwrap();
    app.send(Method::POST, "/api/cards", Some(&token), Some(json!({ "title": "Crates", "tag_ids": [tag_id] })))
        .await;
    app.send(Method::POST, "/api/cards", Some(&token), Some(json!({ "title": "Cooking" }))).await;

    let (_, tagged) = app.send(Method::GET, &format!("/api/cards?tags={tag_id},junk"), None, None).await;
    assert_eq!(tagged.as_array().unwrap().len(), 1);
    assert_eq!(tagged[0]["title"], "Crates");

    let (_, searched) = app.send(Method::GET, "/api/cards?search=cook", None, None).await;
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["title"], "Cooking");
}

#[tokio::test]
async fn card_links_follow_access_grants() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;
    let user = app.create_user("viewer", false).await;
    let admin_token = app.token_for(&admin);
    let user_token = app.token_for(&user);

    let (_, card) = app.send(Method::POST, "/api/cards", Some(&admin_token), Some(json!({ "title": "Private" }))).await;
    let card_id = card["id"].as_i64().unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/links",
            Some(&admin_token),
            Some(json!({ "card_id": card_id, "url": "https://example.com", "title": "Example" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let links_uri = format!("/api/cards/{card_id}/links");
    let (status, _) = app.send(Method::GET, &links_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, &links_uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, &format!("/api/cards/{card_id}/access"), Some(&admin_token), Some(json!({ "userId": user.id })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, links) = app.send(Method::GET, &links_uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links[0]["url"], "https://example.com");

    let (_, users) = app.send(Method::GET, &format!("/api/cards/{card_id}/access"), Some(&admin_token), None).await;
    assert_eq!(users[0]["username"], "viewer");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/cards/{card_id}/access/{}", user.id), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &links_uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;
    let token = app.token_for(&admin);
    let body = json!({ "username": "twin", "password": "secret" });

    let (status, _) = app.send(Method::POST, "/api/users", Some(&token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send(Method::POST, "/api/users", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    // development responses carry the underlying error text
    assert!(body["detail"].as_str().unwrap().contains("users_username_key"));
}

#[tokio::test]
async fn admins_cannot_delete_themselves_over_http() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/users/{}", admin.id), Some(&app.token_for(&admin)), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_workflow_over_http() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;
    let user = app.create_user("asker", false).await;
    let admin_token = app.token_for(&admin);
    let user_token = app.token_for(&user);

    let (status, created) = app
        .send(Method::POST, "/api/card-requests", Some(&user_token), Some(json!({ "title": "Monitoring" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let request_id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .send(Method::PUT, &format!("/api/card-requests/{request_id}/status"), Some(&user_token), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::PUT, &format!("/api/card-requests/{request_id}/status"), Some(&admin_token), Some(json!({ "status": "maybe" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .send(Method::PUT, &format!("/api/card-requests/{request_id}/status"), Some(&admin_token), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "approved");

    let (_, approved) = app.send(Method::GET, "/api/card-requests?status=approved", Some(&user_token), None).await;
    assert_eq!(approved.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn requests_are_refused_once_shutdown_begins() {
    let app = common::test_app();
    app.state.begin_shutdown();

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Server is shutting down");
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;

    let (status, _) = app.send(Method::GET, "/api/cards/4242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::PUT, "/api/tags/4242", Some(&app.token_for(&admin)), Some(json!({ "name": "ghost" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_tags_and_links_can_be_fetched() {
    let app = common::test_app();
    let admin = app.create_user("admin", true).await;
    let user = app.create_user("viewer", false).await;
    let admin_token = app.token_for(&admin);
    let user_token = app.token_for(&user);

    let (_, tag) = app
        .send(Method::POST, "/api/tags", Some(&admin_token), Some(json!({ "name": "reading", "color": "#123456" })))
        .await;
    let (status, fetched) = app.send(Method::GET, &format!("/api/tags/{}", tag["id"]), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "reading");

    let (_, card) = app.send(Method::POST, "/api/cards", Some(&admin_token), Some(json!({ "title": "Shelf" }))).await;
    let (_, link) = app
        .send(
            Method::POST,
            "/api/links",
            Some(&admin_token),
            Some(json!({ "card_id": card["id"], "url": "https://example.org/book" })),
        )
        .await;
    let link_uri = format!("/api/links/{}", link["id"]);

    let (status, _) = app.send(Method::GET, &link_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(Method::GET, &link_uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.send(Method::POST, &format!("/api/cards/{}/access", card["id"]), Some(&admin_token), Some(json!({ "userId": user.id })))
        .await;
    let (status, fetched) = app.send(Method::GET, &link_uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["url"], "https://example.org/book");

    let (status, _) = app.send(Method::GET, "/api/links/4242", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::GET, "/api/tags/4242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
