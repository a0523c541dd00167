use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Link {
    pub id: i32,
    pub card_id: i32,
    pub title: Option<String>,
    pub url: String,
    pub order_index: i32, // explicit sort key, ties broken by id
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub card_id: i32,
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub order_index: i32,
}

/// Sorts links the way every listing presents them.
pub fn sort_links(links: &mut [Link]) {
    links.sort_by_key(|link| (link.order_index, link.id));
}
