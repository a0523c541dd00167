use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::auth::middleware::AdminUser;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User};
use crate::{AppError, AppState, Result};

pub async fn list_users(State(app_state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<User>>> {
    Ok(Json(app_state.user_service.list_users().await?))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<User>> {
    let user = app_state
        .user_service
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn create_user(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = app_state.user_service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    Ok(Json(app_state.user_service.update_user(user_id, request).await?))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>> {
    app_state.user_service.delete_user(admin.user.id, user_id).await?;
    Ok(Json(json!({ "success": true })))
}
