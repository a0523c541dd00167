use std::sync::Arc;

use crate::db::repository::{AccessRepository, CardRepository, UserRepository};
use crate::models::CardAccessUser;
use crate::{AppError, Result};

/// Decides who may see a card's links. Admins always may; everyone else
/// needs an explicit grant row.
pub struct AccessService {
    access_repo: Arc<dyn AccessRepository>,
    card_repo: Arc<dyn CardRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl AccessService {
    pub fn new(
        access_repo: Arc<dyn AccessRepository>,
        card_repo: Arc<dyn CardRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self { access_repo, card_repo, user_repo }
    }

    pub async fn has_access(&self, user_id: i32, card_id: i32, is_admin: bool) -> Result<bool> {
        if is_admin {
            return Ok(true);
        }
        self.access_repo.has_grant(user_id, card_id).await
    }

    pub async fn grant_access(&self, card_id: i32, user_id: i32) -> Result<()> {
        self.ensure_card(card_id).await?;
        self.ensure_user(user_id).await?;
        self.access_repo.grant(card_id, user_id).await?;
        tracing::info!("🔓 ACCESS: Granted card {} to user {}", card_id, user_id);
        Ok(())
    }

    pub async fn revoke_access(&self, card_id: i32, user_id: i32) -> Result<()> {
        self.access_repo.revoke(card_id, user_id).await?;
        tracing::info!("🔒 ACCESS: Revoked card {} from user {}", card_id, user_id);
        Ok(())
    }

    pub async fn list_card_users(&self, card_id: i32) -> Result<Vec<CardAccessUser>> {
        self.ensure_card(card_id).await?;
        self.access_repo.list_card_users(card_id).await
    }

    pub async fn list_user_cards(&self, user_id: i32) -> Result<Vec<i32>> {
        self.access_repo.list_user_cards(user_id).await
    }

    async fn ensure_card(&self, card_id: i32) -> Result<()> {
        match self.card_repo.get_card_by_id(card_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Card not found".to_string())),
        }
    }

    async fn ensure_user(&self, user_id: i32) -> Result<()> {
        match self.user_repo.get_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }
}
