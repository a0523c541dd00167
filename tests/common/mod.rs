#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use link_organizer::db::mock::MockStore;
use link_organizer::db::DatabaseClient;
use link_organizer::models::user::{CreateUserRequest, User};
use link_organizer::server::build_app;
use link_organizer::{AppConfig, AppState};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MockStore>,
    pub router: Router,
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        "CREATE_DEFAULT_ADMIN" => Some("false".to_string()),
        "APK_PATH" => Some("does/not/exist.apk".to_string()),
        _ => None,
    })
}

pub fn test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MockStore::new());
    let db = DatabaseClient::in_memory(&config, store.clone());
    let state = AppState::with_database(config, db);
    let router = build_app(state.clone());
    TestApp { state, store, router }
}

impl TestApp {
    pub async fn create_user(&self, username: &str, is_admin: bool) -> User {
        self.state
            .user_service
            .create_user(CreateUserRequest {
                username: username.to_string(),
                password: format!("{username}-password"),
                is_admin,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.auth_service.generate_token(user).unwrap()
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }
}
