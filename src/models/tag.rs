use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Reserved tag carried by every card that originated from a card request.
pub const REQUEST_TAG_NAME: &str = "request";
pub const REQUEST_TAG_COLOR: &str = "#4ade80";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub color: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}
