use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::auth::middleware::AdminUser;
use crate::models::{Tag, TagInput};
use crate::{AppState, Result};

pub async fn list_tags(State(app_state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(app_state.catalog_service.list_tags().await?))
}

pub async fn get_tag(State(app_state): State<AppState>, Path(tag_id): Path<i32>) -> Result<Json<Tag>> {
    Ok(Json(app_state.catalog_service.get_tag(tag_id).await?))
}

pub async fn create_tag(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<TagInput>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = app_state.catalog_service.create_tag(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(tag_id): Path<i32>,
    Json(input): Json<TagInput>,
) -> Result<Json<Tag>> {
    Ok(Json(app_state.catalog_service.update_tag(tag_id, input).await?))
}

pub async fn delete_tag(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(tag_id): Path<i32>,
) -> Result<Json<Value>> {
    app_state.catalog_service.delete_tag(tag_id).await?;
    Ok(Json(json!({ "success": true })))
}
