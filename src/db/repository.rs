// Repository trait abstractions for database operations
use async_trait::async_trait;

use crate::models::card_request::{CardRequest, CardRequestStatus, CreateCardRequest};
use crate::models::link::{CreateLinkRequest, Link, UpdateLinkRequest};
use crate::models::user::{CardAccessUser, CreateUserRequest, UpdateUserRequest, User, UserCredentials};
use crate::models::{CardFilter, CardInput, CardWithTags, Tag, TagInput};
use crate::Result;

/// Users. Plaintext passwords are hashed inside the repository; no method
/// other than `get_user_by_username` ever exposes the stored hash.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>>;
    async fn create_user(&self, user: &CreateUserRequest) -> Result<User>;
    async fn update_user(&self, id: i32, user: &UpdateUserRequest) -> Result<Option<User>>;
    async fn delete_user(&self, id: i32) -> Result<()>;
    async fn count_admins(&self) -> Result<i64>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Cards ordered by id, each with its aggregated tag ids.
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<CardWithTags>>;
    async fn get_card_by_id(&self, id: i32) -> Result<Option<CardWithTags>>;
    async fn create_card(&self, card: &CardInput) -> Result<CardWithTags>;
    /// Replaces the card's tag set in the same transaction as the row update.
    async fn update_card(&self, id: i32, card: &CardInput) -> Result<Option<CardWithTags>>;
    async fn delete_card(&self, id: i32) -> Result<()>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    async fn get_tag_by_id(&self, id: i32) -> Result<Option<Tag>>;
    async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    async fn create_tag(&self, tag: &TagInput) -> Result<Tag>;
    async fn update_tag(&self, id: i32, tag: &TagInput) -> Result<Option<Tag>>;
    async fn delete_tag(&self, id: i32) -> Result<()>;
}

#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn list_links_by_card(&self, card_id: i32) -> Result<Vec<Link>>;
    async fn get_link_by_id(&self, id: i32) -> Result<Option<Link>>;
    async fn create_link(&self, link: &CreateLinkRequest) -> Result<Link>;
    async fn update_link(&self, id: i32, link: &UpdateLinkRequest) -> Result<Option<Link>>;
    /// Returns the links left on the parent card, or `None` if `id` did not exist.
    async fn delete_link(&self, id: i32) -> Result<Option<Vec<Link>>>;
}

#[async_trait]
pub trait AccessRepository: Send + Sync {
    async fn has_grant(&self, user_id: i32, card_id: i32) -> Result<bool>;
    /// Idempotent: a repeated grant leaves a single row and is not an error.
    async fn grant(&self, card_id: i32, user_id: i32) -> Result<()>;
    /// A no-op when no grant exists.
    async fn revoke(&self, card_id: i32, user_id: i32) -> Result<()>;
    async fn list_card_users(&self, card_id: i32) -> Result<Vec<CardAccessUser>>;
    async fn list_user_cards(&self, user_id: i32) -> Result<Vec<i32>>;
}

#[async_trait]
pub trait CardRequestRepository: Send + Sync {
    /// Newest first, optionally restricted to one status.
    async fn list_requests(&self, status: Option<CardRequestStatus>) -> Result<Vec<CardRequest>>;
    async fn get_request_by_id(&self, id: i32) -> Result<Option<CardRequest>>;
    /// Inserts the pending request and its card (tagged `request` only) in
    /// one transaction and links them together.
    async fn create_request_with_card(
        &self,
        request: &CreateCardRequest,
        requested_by: i32,
        card_title: &str,
    ) -> Result<CardRequest>;
    async fn update_request_status(&self, id: i32, status: CardRequestStatus) -> Result<Option<CardRequest>>;
    async fn delete_request(&self, id: i32) -> Result<()>;
}
