use std::sync::Arc;

use crate::db::repository::{CardRepository, LinkRepository, TagRepository};
use crate::models::link::{CreateLinkRequest, Link, UpdateLinkRequest};
use crate::models::{CardFilter, CardInput, CardWithTags, Tag, TagInput};
use crate::{AppError, Result};

/// Cards, tags and links: input checks in front of the repositories.
pub struct CatalogService {
    card_repo: Arc<dyn CardRepository>,
    tag_repo: Arc<dyn TagRepository>,
    link_repo: Arc<dyn LinkRepository>,
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(message.to_string()));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(
        card_repo: Arc<dyn CardRepository>,
        tag_repo: Arc<dyn TagRepository>,
        link_repo: Arc<dyn LinkRepository>,
    ) -> Self {
        Self { card_repo, tag_repo, link_repo }
    }

    pub async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<CardWithTags>> {
        self.card_repo.list_cards(filter).await
    }

    pub async fn get_card(&self, id: i32) -> Result<CardWithTags> {
        self.card_repo
            .get_card_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Card not found".to_string()))
    }

    pub async fn create_card(&self, input: CardInput) -> Result<CardWithTags> {
        require(&input.title, "Title is required")?;
        self.card_repo.create_card(&input).await
    }

    pub async fn update_card(&self, id: i32, input: CardInput) -> Result<CardWithTags> {
        require(&input.title, "Title is required")?;
        self.card_repo
            .update_card(id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound("Card not found".to_string()))
    }

    pub async fn delete_card(&self, id: i32) -> Result<()> {
        self.card_repo.delete_card(id).await
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.tag_repo.list_tags().await
    }

    pub async fn get_tag(&self, id: i32) -> Result<Tag> {
        self.tag_repo
            .get_tag_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
    }

    pub async fn create_tag(&self, input: TagInput) -> Result<Tag> {
        require(&input.name, "Tag name is required")?;
        self.tag_repo.create_tag(&input).await
    }

    pub async fn update_tag(&self, id: i32, input: TagInput) -> Result<Tag> {
        require(&input.name, "Tag name is required")?;
        self.tag_repo
            .update_tag(id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
    }

    pub async fn delete_tag(&self, id: i32) -> Result<()> {
        self.tag_repo.delete_tag(id).await
    }

    pub async fn list_links(&self, card_id: i32) -> Result<Vec<Link>> {
        self.link_repo.list_links_by_card(card_id).await
    }

    pub async fn get_link(&self, id: i32) -> Result<Link> {
        self.link_repo
            .get_link_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))
    }

    pub async fn create_link(&self, input: CreateLinkRequest) -> Result<Link> {
        require(&input.url, "URL is required")?;
        self.link_repo.create_link(&input).await
    }

    pub async fn update_link(&self, id: i32, input: UpdateLinkRequest) -> Result<Link> {
        require(&input.url, "URL is required")?;
        self.link_repo
            .update_link(id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))
    }

    /// Remaining links of the deleted link's card.
    pub async fn delete_link(&self, id: i32) -> Result<Vec<Link>> {
        self.link_repo
            .delete_link(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))
    }
}
