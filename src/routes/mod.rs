pub mod access;
pub mod api;
pub mod auth;
pub mod card_requests;
pub mod cards;
pub mod links;
pub mod tags;
pub mod users;

use axum::Router;
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new().nest("/api", api::routes())
}
