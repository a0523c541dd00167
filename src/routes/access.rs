use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::AdminUser;
use crate::models::CardAccessUser;
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    #[serde(alias = "userId")]
    pub user_id: i32,
}

pub async fn list_card_users(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(card_id): Path<i32>,
) -> Result<Json<Vec<CardAccessUser>>> {
    Ok(Json(app_state.access_service.list_card_users(card_id).await?))
}

pub async fn grant_access(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(card_id): Path<i32>,
    Json(request): Json<GrantRequest>,
) -> Result<Json<Value>> {
    app_state.access_service.grant_access(card_id, request.user_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn revoke_access(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path((card_id, user_id)): Path<(i32, i32)>,
) -> Result<Json<Value>> {
    app_state.access_service.revoke_access(card_id, user_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_user_cards(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<i32>>> {
    Ok(Json(app_state.access_service.list_user_cards(user_id).await?))
}
