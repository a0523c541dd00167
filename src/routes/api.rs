use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::routes::{access, auth, card_requests, cards, links, tags, users};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api_health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/current-user", get(auth::current_user))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route(
            "/cards/:card_id",
            get(cards::get_card).put(cards::update_card).delete(cards::delete_card),
        )
        .route("/cards/:card_id/links", get(cards::list_card_links))
        .route("/cards/:card_id/access", get(access::list_card_users).post(access::grant_access))
        .route("/cards/:card_id/access/:user_id", delete(access::revoke_access))
        .route("/links", post(links::create_link))
        .route("/links/:link_id", get(links::get_link).put(links::update_link).delete(links::delete_link))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/:tag_id", get(tags::get_tag).put(tags::update_tag).delete(tags::delete_tag))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:user_id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:user_id/cards", get(access::list_user_cards))
        .route(
            "/card-requests",
            get(card_requests::list_requests).post(card_requests::create_request),
        )
        .route(
            "/card-requests/:request_id",
            get(card_requests::get_request).delete(card_requests::delete_request),
        )
        .route("/card-requests/:request_id/status", put(card_requests::update_status))
}

/// 200 when the database answers, 503 otherwise. Always returns a body.
async fn api_health(State(app_state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = app_state.db.health_check().await;
    let status = if database.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    let body = json!({
        "status": if database.is_healthy() { "ok" } else { "degraded" },
        "service": "link_organizer",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": app_state.started_at.elapsed().as_secs(),
        "port": app_state.bound_port(),
        "initialized": app_state.db.manager.is_initialized(),
        "database": database,
    });

    (status, Json(body))
}
