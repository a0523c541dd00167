use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::{AdminUser, CurrentUser};
use crate::models::card_request::{CardRequest, CreateCardRequest, UpdateStatusRequest};
use crate::{AppState, Result};

#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    pub status: Option<String>,
}

pub async fn create_request(
    State(app_state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardRequest>)> {
    let created = app_state
        .card_request_service
        .create_request(request, current.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_requests(
    State(app_state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<RequestQuery>,
) -> Result<Json<Vec<CardRequest>>> {
    let requests = app_state
        .card_request_service
        .list_requests(query.status.as_deref())
        .await?;
    Ok(Json(requests))
}

pub async fn get_request(
    State(app_state): State<AppState>,
    _current: CurrentUser,
    Path(request_id): Path<i32>,
) -> Result<Json<CardRequest>> {
    Ok(Json(app_state.card_request_service.get_request(request_id).await?))
}

pub async fn update_status(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(request_id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<CardRequest>> {
    let updated = app_state
        .card_request_service
        .update_status(request_id, &request.status)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_request(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(request_id): Path<i32>,
) -> Result<Json<Value>> {
    app_state.card_request_service.delete_request(request_id).await?;
    Ok(Json(json!({ "success": true })))
}
