use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::auth::middleware::{CurrentUser, MaybeUser};
use crate::models::user::LoginRequest;
use crate::{AppState, Result};

pub async fn login(
    State(app_state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let (user, token) = app_state
        .user_service
        .authenticate_user(&request.username, &request.password, &app_state.auth_service)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "token": token
    })))
}

pub async fn logout(State(app_state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    app_state.auth_service.revoke(&current.claims)?;
    Ok(Json(json!({ "success": true })))
}

pub async fn current_user(MaybeUser(current): MaybeUser) -> Json<Value> {
    Json(json!({ "user": current.map(|c| c.user) }))
}
