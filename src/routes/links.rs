use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::middleware::{AdminUser, CurrentUser};
use crate::models::link::{CreateLinkRequest, Link, UpdateLinkRequest};
use crate::{AppError, AppState, Result};

/// A single link, visible to anyone who may view its card.
pub async fn get_link(
    State(app_state): State<AppState>,
    current: CurrentUser,
    Path(link_id): Path<i32>,
) -> Result<Json<Link>> {
    let link = app_state.catalog_service.get_link(link_id).await?;
    let allowed = app_state
        .access_service
        .has_access(current.user.id, link.card_id, current.user.is_admin)
        .await?;

    if !allowed {
        return Err(AppError::Forbidden("You do not have permission to view this link".to_string()));
    }

    Ok(Json(link))
}

pub async fn create_link(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>)> {
    let link = app_state.catalog_service.create_link(request).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update_link(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(link_id): Path<i32>,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<Json<Link>> {
    Ok(Json(app_state.catalog_service.update_link(link_id, request).await?))
}

/// Responds with the links still attached to the card.
pub async fn delete_link(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(link_id): Path<i32>,
) -> Result<Json<Vec<Link>>> {
    Ok(Json(app_state.catalog_service.delete_link(link_id).await?))
}
