use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::{AdminUser, CurrentUser};
use crate::models::{CardFilter, CardInput, CardWithTags, Link};
use crate::{AppError, AppState, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CardQuery {
    pub search: Option<String>,
    /// Comma-separated tag ids; entries that are not integers are ignored.
    pub tags: Option<String>,
}

pub fn parse_tag_ids(raw: &str) -> Vec<i32> {
    raw.split(',').filter_map(|part| part.trim().parse().ok()).collect()
}

pub async fn list_cards(
    State(app_state): State<AppState>,
    Query(query): Query<CardQuery>,
) -> Result<Json<Vec<CardWithTags>>> {
    let tag_ids = query.tags.as_deref().map(parse_tag_ids).unwrap_or_default();
    let filter = CardFilter::new(query.search, tag_ids);
    Ok(Json(app_state.catalog_service.list_cards(&filter).await?))
}

pub async fn get_card(
    State(app_state): State<AppState>,
    Path(card_id): Path<i32>,
) -> Result<Json<CardWithTags>> {
    Ok(Json(app_state.catalog_service.get_card(card_id).await?))
}

pub async fn create_card(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<CardInput>,
) -> Result<(StatusCode, Json<CardWithTags>)> {
    let card = app_state.catalog_service.create_card(input).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(card_id): Path<i32>,
    Json(input): Json<CardInput>,
) -> Result<Json<CardWithTags>> {
    Ok(Json(app_state.catalog_service.update_card(card_id, input).await?))
}

pub async fn delete_card(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(card_id): Path<i32>,
) -> Result<Json<Value>> {
    app_state.catalog_service.delete_card(card_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Links are only shown to admins and to users holding a grant on the card.
pub async fn list_card_links(
    State(app_state): State<AppState>,
    current: CurrentUser,
    Path(card_id): Path<i32>,
) -> Result<Json<Vec<Link>>> {
    let allowed = app_state
        .access_service
        .has_access(current.user.id, card_id, current.user.is_admin)
        .await?;

    if !allowed {
        return Err(AppError::Forbidden(
            "You do not have permission to view this card's links".to_string(),
        ));
    }

    Ok(Json(app_state.catalog_service.list_links(card_id).await?))
}
