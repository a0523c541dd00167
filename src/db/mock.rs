// In-memory repositories backing the test suites.
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::auth::password::hash_password;
use crate::db::repository::{
    AccessRepository, CardRepository, CardRequestRepository, LinkRepository, TagRepository,
    UserRepository,
};
use crate::models::card::dedup_tag_ids;
use crate::models::card_request::{CardRequest, CardRequestStatus, CreateCardRequest};
use crate::models::link::{sort_links, CreateLinkRequest, Link, UpdateLinkRequest};
use crate::models::tag::{REQUEST_TAG_COLOR, REQUEST_TAG_NAME};
use crate::models::user::{CardAccessUser, CreateUserRequest, UpdateUserRequest, User, UserCredentials};
use crate::models::{Card, CardFilter, CardInput, CardWithTags, Tag, TagInput};
use crate::{AppError, Result};

struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct Sequences {
    users: i32,
    cards: i32,
    tags: i32,
    links: i32,
    requests: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct MockState {
    seq: Sequences,
    users: BTreeMap<i32, StoredUser>,
    cards: BTreeMap<i32, Card>,
    tags: BTreeMap<i32, Tag>,
    links: BTreeMap<i32, Link>,
    card_tags: BTreeSet<(i32, i32)>,                  // (card_id, tag_id)
    access: BTreeMap<(i32, i32), NaiveDateTime>,      // (card_id, user_id) -> granted at
    requests: BTreeMap<i32, CardRequest>,
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::Conflict(format!("duplicate key value violates unique constraint \"{}\"", constraint))
}

fn missing_reference(table: &str, id: i32) -> AppError {
    AppError::InvalidReference(format!("{} {} does not exist", table, id))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl MockState {
    fn tag_ids_for(&self, card_id: i32) -> Vec<i32> {
        self.card_tags
            .iter()
            .filter(|(card, _)| *card == card_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    fn card_with_tags(&self, card: &Card) -> CardWithTags {
        CardWithTags { card: card.clone(), tag_ids: self.tag_ids_for(card.id) }
    }

    fn check_tags_exist(&self, tag_ids: &[i32]) -> Result<()> {
        match tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(id) => Err(missing_reference("tag", *id)),
            None => Ok(()),
        }
    }

    fn links_for(&self, card_id: i32) -> Vec<Link> {
        let mut links: Vec<Link> = self.links.values().filter(|l| l.card_id == card_id).cloned().collect();
        sort_links(&mut links);
        links
    }

    fn with_username(&self, request: &CardRequest) -> CardRequest {
        let mut request = request.clone();
        request.requested_by_username = request
            .requested_by
            .and_then(|id| self.users.get(&id))
            .map(|stored| stored.user.username.clone());
        request
    }

    fn insert_card(&mut self, input: &CardInput, title: &str) -> Result<CardWithTags> {
        let tag_ids = dedup_tag_ids(&input.tag_ids);
        self.check_tags_exist(&tag_ids)?;

        let id = next(&mut self.seq.cards);
        let created = now();
        let card = Card {
            id,
            title: title.to_string(),
            description: input.description.clone(),
            icon: input.icon.clone(),
            color: input.color.clone(),
            thumbnail_url: input.thumbnail_url.clone(),
            created_at: Some(created),
            updated_at: Some(created),
        };
        self.cards.insert(id, card.clone());
        for tag_id in tag_ids {
            self.card_tags.insert((id, tag_id));
        }
        Ok(self.card_with_tags(&card))
    }

    fn request_tag_id(&mut self) -> i32 {
        if let Some(tag) = self.tags.values().find(|t| t.name == REQUEST_TAG_NAME) {
            return tag.id;
        }
        let id = next(&mut self.seq.tags);
        self.tags.insert(
            id,
            Tag {
                id,
                name: REQUEST_TAG_NAME.to_string(),
                color: Some(REQUEST_TAG_COLOR.to_string()),
                created_at: Some(now()),
            },
        );
        id
    }
}

/// One store implementing every repository trait, with the same uniqueness,
/// foreign-key and cascade rules as the relational schema.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
    access_lookups: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalError("mock store lock poisoned".to_string()))
    }

    /// Number of grant lookups performed so far.
    pub fn access_lookups(&self) -> usize {
        self.access_lookups.load(Ordering::SeqCst)
    }

    /// Number of grant rows for a (card, user) pair.
    pub fn grant_rows(&self, card_id: i32, user_id: i32) -> usize {
        self.state()
            .map(|s| usize::from(s.access.contains_key(&(card_id, user_id))))
            .unwrap_or(0)
    }

    /// Inserts a user row with a stored hash as-is, the way rows written by
    /// other tooling arrive.
    pub fn insert_user_with_hash(&self, username: &str, password_hash: &str, is_admin: bool) -> Result<User> {
        let mut state = self.state()?;
        if state.users.values().any(|s| s.user.username == username) {
            return Err(unique_violation("users_username_key"));
        }
        let id = next(&mut state.seq.users);
        let user = User { id, username: username.to_string(), is_admin, created_at: Some(now()) };
        state.users.insert(id, StoredUser { user: user.clone(), password_hash: password_hash.to_string() });
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for MockStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state()?;
        let mut users: Vec<User> = state.users.values().map(|s| s.user.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        Ok(self.state()?.users.get(&id).map(|s| s.user.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>> {
        let state = self.state()?;
        Ok(state
            .users
            .values()
            .find(|s| s.user.username == username)
            .map(|s| UserCredentials {
                id: s.user.id,
                username: s.user.username.clone(),
                password_hash: s.password_hash.clone(),
                is_admin: s.user.is_admin,
            }))
    }

    async fn create_user(&self, user: &CreateUserRequest) -> Result<User> {
        let password_hash = hash_password(&user.password)?;
        let mut state = self.state()?;
        if state.users.values().any(|s| s.user.username == user.username) {
            return Err(unique_violation("users_username_key"));
        }

        let id = next(&mut state.seq.users);
        let created = User {
            id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            created_at: Some(now()),
        };
        state.users.insert(id, StoredUser { user: created.clone(), password_hash });
        Ok(created)
    }

    async fn update_user(&self, id: i32, user: &UpdateUserRequest) -> Result<Option<User>> {
        let new_hash = user.password.as_deref().map(hash_password).transpose()?;
        let mut state = self.state()?;
        if state.users.values().any(|s| s.user.username == user.username && s.user.id != id) {
            return Err(unique_violation("users_username_key"));
        }

        let Some(stored) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        stored.user.username = user.username.clone();
        stored.user.is_admin = user.is_admin;
        if let Some(hash) = new_hash {
            stored.password_hash = hash;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete_user(&self, id: i32) -> Result<()> {
        let mut state = self.state()?;
        state.users.remove(&id);
        state.access.retain(|(_, user_id), _| *user_id != id);
        for request in state.requests.values_mut() {
            if request.requested_by == Some(id) {
                request.requested_by = None;
            }
        }
        Ok(())
    }

    async fn count_admins(&self) -> Result<i64> {
        Ok(self.state()?.users.values().filter(|s| s.user.is_admin).count() as i64)
    }
}

#[async_trait]
impl CardRepository for MockStore {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<CardWithTags>> {
        let state = self.state()?;
        Ok(state
            .cards
            .values()
            .filter(|card| filter.matches_text(card))
            .map(|card| state.card_with_tags(card))
            .filter(|card| filter.matches_tags(&card.tag_ids))
            .collect())
    }

    async fn get_card_by_id(&self, id: i32) -> Result<Option<CardWithTags>> {
        let state = self.state()?;
        Ok(state.cards.get(&id).map(|card| state.card_with_tags(card)))
    }

    async fn create_card(&self, card: &CardInput) -> Result<CardWithTags> {
        self.state()?.insert_card(card, &card.title)
    }

    async fn update_card(&self, id: i32, input: &CardInput) -> Result<Option<CardWithTags>> {
        let mut state = self.state()?;
        let tag_ids = dedup_tag_ids(&input.tag_ids);
        state.check_tags_exist(&tag_ids)?;

        let Some(card) = state.cards.get_mut(&id) else {
            return Ok(None);
        };
        card.title = input.title.clone();
        card.description = input.description.clone();
        card.icon = input.icon.clone();
        card.color = input.color.clone();
        card.thumbnail_url = input.thumbnail_url.clone();
        card.updated_at = Some(now());
        let card = card.clone();

        state.card_tags.retain(|(card_id, _)| *card_id != id);
        for tag_id in tag_ids {
            state.card_tags.insert((id, tag_id));
        }
        Ok(Some(state.card_with_tags(&card)))
    }

    async fn delete_card(&self, id: i32) -> Result<()> {
        let mut state = self.state()?;
        state.cards.remove(&id);
        state.links.retain(|_, link| link.card_id != id);
        state.card_tags.retain(|(card_id, _)| *card_id != id);
        state.access.retain(|(card_id, _), _| *card_id != id);
        for request in state.requests.values_mut() {
            if request.card_id == Some(id) {
                request.card_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepository for MockStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.state()?.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag_by_id(&self, id: i32) -> Result<Option<Tag>> {
        Ok(self.state()?.tags.get(&id).cloned())
    }

    async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.state()?.tags.values().find(|t| t.name == name).cloned())
    }

    async fn create_tag(&self, tag: &TagInput) -> Result<Tag> {
        let mut state = self.state()?;
        if state.tags.values().any(|t| t.name == tag.name) {
            return Err(unique_violation("tags_name_key"));
        }
        let id = next(&mut state.seq.tags);
        let created = Tag { id, name: tag.name.clone(), color: tag.color.clone(), created_at: Some(now()) };
        state.tags.insert(id, created.clone());
        Ok(created)
    }

    async fn update_tag(&self, id: i32, tag: &TagInput) -> Result<Option<Tag>> {
        let mut state = self.state()?;
        if state.tags.values().any(|t| t.name == tag.name && t.id != id) {
            return Err(unique_violation("tags_name_key"));
        }
        Ok(state.tags.get_mut(&id).map(|existing| {
            existing.name = tag.name.clone();
            existing.color = tag.color.clone();
            existing.clone()
        }))
    }

    async fn delete_tag(&self, id: i32) -> Result<()> {
        let mut state = self.state()?;
        state.tags.remove(&id);
        state.card_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for MockStore {
    async fn list_links_by_card(&self, card_id: i32) -> Result<Vec<Link>> {
        Ok(self.state()?.links_for(card_id))
    }

    async fn get_link_by_id(&self, id: i32) -> Result<Option<Link>> {
        Ok(self.state()?.links.get(&id).cloned())
    }

    async fn create_link(&self, link: &CreateLinkRequest) -> Result<Link> {
        let mut state = self.state()?;
        if !state.cards.contains_key(&link.card_id) {
            return Err(missing_reference("card", link.card_id));
        }
        let id = next(&mut state.seq.links);
        let created = Link {
            id,
            card_id: link.card_id,
            title: link.title.clone(),
            url: link.url.clone(),
            order_index: link.order_index,
            created_at: Some(now()),
        };
        state.links.insert(id, created.clone());
        Ok(created)
    }

    async fn update_link(&self, id: i32, link: &UpdateLinkRequest) -> Result<Option<Link>> {
        let mut state = self.state()?;
        Ok(state.links.get_mut(&id).map(|existing| {
            existing.title = link.title.clone();
            existing.url = link.url.clone();
            existing.order_index = link.order_index;
            existing.clone()
        }))
    }

    async fn delete_link(&self, id: i32) -> Result<Option<Vec<Link>>> {
        let mut state = self.state()?;
        Ok(state.links.remove(&id).map(|removed| state.links_for(removed.card_id)))
    }
}

#[async_trait]
impl AccessRepository for MockStore {
    async fn has_grant(&self, user_id: i32, card_id: i32) -> Result<bool> {
        self.access_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.state()?.access.contains_key(&(card_id, user_id)))
    }

    async fn grant(&self, card_id: i32, user_id: i32) -> Result<()> {
        let mut state = self.state()?;
        if !state.cards.contains_key(&card_id) {
            return Err(missing_reference("card", card_id));
        }
        if !state.users.contains_key(&user_id) {
            return Err(missing_reference("user", user_id));
        }
        state.access.entry((card_id, user_id)).or_insert_with(now);
        Ok(())
    }

    async fn revoke(&self, card_id: i32, user_id: i32) -> Result<()> {
        self.state()?.access.remove(&(card_id, user_id));
        Ok(())
    }

    async fn list_card_users(&self, card_id: i32) -> Result<Vec<CardAccessUser>> {
        let state = self.state()?;
        let mut users: Vec<CardAccessUser> = state
            .access
            .iter()
            .filter(|((card, _), _)| *card == card_id)
            .filter_map(|((_, user_id), granted_at)| {
                state.users.get(user_id).map(|s| CardAccessUser {
                    id: s.user.id,
                    username: s.user.username.clone(),
                    is_admin: s.user.is_admin,
                    created_at: Some(*granted_at),
                })
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn list_user_cards(&self, user_id: i32) -> Result<Vec<i32>> {
        let state = self.state()?;
        Ok(state
            .access
            .keys()
            .filter(|(_, user)| *user == user_id)
            .map(|(card, _)| *card)
            .collect())
    }
}

#[async_trait]
impl CardRequestRepository for MockStore {
    async fn list_requests(&self, status: Option<CardRequestStatus>) -> Result<Vec<CardRequest>> {
        let state = self.state()?;
        let mut requests: Vec<CardRequest> = state
            .requests
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| state.with_username(r))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn get_request_by_id(&self, id: i32) -> Result<Option<CardRequest>> {
        let state = self.state()?;
        Ok(state.requests.get(&id).map(|r| state.with_username(r)))
    }

    async fn create_request_with_card(
        &self,
        request: &CreateCardRequest,
        requested_by: i32,
        card_title: &str,
    ) -> Result<CardRequest> {
        let mut state = self.state()?;
        if !state.users.contains_key(&requested_by) {
            return Err(missing_reference("user", requested_by));
        }

        let tag_id = state.request_tag_id();
        let card_input = CardInput {
            title: card_title.to_string(),
            description: request.description.clone(),
            icon: request.icon.clone(),
            color: None,
            thumbnail_url: request.thumbnail_url.clone(),
            tag_ids: vec![tag_id],
        };
        let card = state.insert_card(&card_input, card_title)?;

        let id = next(&mut state.seq.requests);
        let created = CardRequest {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            icon: request.icon.clone(),
            thumbnail_url: request.thumbnail_url.clone(),
            requested_by: Some(requested_by),
            card_id: Some(card.card.id),
            status: CardRequestStatus::Pending,
            created_at: Some(now()),
            requested_by_username: None,
        };
        state.requests.insert(id, created.clone());
        Ok(state.with_username(&created))
    }

    async fn update_request_status(&self, id: i32, status: CardRequestStatus) -> Result<Option<CardRequest>> {
        let mut state = self.state()?;
        let Some(request) = state.requests.get_mut(&id) else {
            return Ok(None);
        };
        request.status = status;
        let request = request.clone();
        Ok(Some(state.with_username(&request)))
    }

    async fn delete_request(&self, id: i32) -> Result<()> {
        self.state()?.requests.remove(&id);
        Ok(())
    }
}
