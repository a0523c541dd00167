use std::sync::Arc;

use crate::db::repository::CardRequestRepository;
use crate::models::card_request::{pending_card_title, CardRequest, CardRequestStatus, CreateCardRequest};
use crate::{AppError, Result};

/// Turns user submissions into visible cards and records moderation decisions.
///
/// A new request immediately gets a card titled with the pending prefix and
/// tagged `request`, so it shows up in listings before anyone reviews it.
/// Changing the status does not touch that card; promoting it to a regular
/// card is done by editing the card itself.
pub struct CardRequestService {
    request_repo: Arc<dyn CardRequestRepository>,
}

impl CardRequestService {
    pub fn new(request_repo: Arc<dyn CardRequestRepository>) -> Self {
        Self { request_repo }
    }

    pub async fn create_request(&self, mut data: CreateCardRequest, requested_by: i32) -> Result<CardRequest> {
        data.title = data.title.trim().to_string();
        if data.title.is_empty() {
            return Err(AppError::ValidationError("Title is required".to_string()));
        }

        let card_title = pending_card_title(&data.title);
        let request = self
            .request_repo
            .create_request_with_card(&data, requested_by, &card_title)
            .await?;

        tracing::info!(
            "📝 REQUESTS: User {} submitted request {} (card {:?})",
            requested_by,
            request.id,
            request.card_id
        );
        Ok(request)
    }

    pub async fn update_status(&self, id: i32, status: &str) -> Result<CardRequest> {
        if status.trim().is_empty() {
            return Err(AppError::ValidationError("Status is required".to_string()));
        }
        let status: CardRequestStatus = status.parse()?;

        let request = self
            .request_repo
            .update_request_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Card request not found".to_string()))?;

        tracing::info!("📝 REQUESTS: Request {} marked {}", id, status);
        Ok(request)
    }

    pub async fn list_requests(&self, status: Option<&str>) -> Result<Vec<CardRequest>> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<CardRequestStatus>()?),
            None => None,
        };
        self.request_repo.list_requests(status).await
    }

    pub async fn get_request(&self, id: i32) -> Result<CardRequest> {
        self.request_repo
            .get_request_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Card request not found".to_string()))
    }

    /// Leaves the associated card in place.
    pub async fn delete_request(&self, id: i32) -> Result<()> {
        self.request_repo.delete_request(id).await
    }
}
