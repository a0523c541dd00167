use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AppError;

/// Prefix marking a card that was materialized from a pending request.
pub const REQUEST_TITLE_PREFIX: &str = "[REQUEST] ";

/// Moderation state of a card request. Only these three values are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl CardRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardRequestStatus::Pending => "pending",
            CardRequestStatus::Approved => "approved",
            CardRequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CardRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardRequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(CardRequestStatus::Pending),
            "approved" => Ok(CardRequestStatus::Approved),
            "rejected" => Ok(CardRequestStatus::Rejected),
            other => Err(AppError::ValidationError(format!(
                "Unknown request status '{}'; expected pending, approved or rejected",
                other
            ))),
        }
    }
}

impl CardRequestStatus {
    /// Reads a stored status. Rows written by older tooling may carry any
    /// string; those are treated as still awaiting moderation.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ REQUESTS: Unknown stored status '{}', treating it as pending", value);
            CardRequestStatus::Pending
        })
    }
}

impl From<String> for CardRequestStatus {
    fn from(value: String) -> Self {
        CardRequestStatus::from_stored(&value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct CardRequest {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub thumbnail_url: Option<String>,
    pub requested_by: Option<i32>,
    pub card_id: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: CardRequestStatus,
    pub created_at: Option<NaiveDateTime>,
    pub requested_by_username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub fn pending_card_title(title: &str) -> String {
    format!("{}{}", REQUEST_TITLE_PREFIX, title.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_parse_case_insensitively() {
        assert_eq!("pending".parse::<CardRequestStatus>().unwrap(), CardRequestStatus::Pending);
        assert_eq!(" Approved ".parse::<CardRequestStatus>().unwrap(), CardRequestStatus::Approved);
        assert_eq!("REJECTED".parse::<CardRequestStatus>().unwrap(), CardRequestStatus::Rejected);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            "archived".parse::<CardRequestStatus>(),
            Err(AppError::ValidationError(_))
        ));
        assert!("".parse::<CardRequestStatus>().is_err());
    }

    #[test]
    fn stray_stored_status_reads_as_pending() {
        assert_eq!(CardRequestStatus::from_stored("in-review"), CardRequestStatus::Pending);
        assert_eq!(CardRequestStatus::from(String::new()), CardRequestStatus::Pending);
        assert_eq!(CardRequestStatus::from("Rejected".to_string()), CardRequestStatus::Rejected);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(CardRequestStatus::Approved).unwrap(), "approved");
        assert_eq!(CardRequestStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn pending_title_carries_prefix() {
        assert_eq!(pending_card_title("  Rust books "), "[REQUEST] Rust books");
    }
}
