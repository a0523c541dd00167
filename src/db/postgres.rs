// PostgreSQL repository implementations using sqlx
use async_trait::async_trait;
use sqlx::Connection;
use std::sync::Arc;

use crate::auth::password::hash_password;
use crate::db::connection::ConnectionManager;
use crate::db::repository::{
    AccessRepository, CardRepository, CardRequestRepository, LinkRepository, TagRepository,
    UserRepository,
};
use crate::models::card::{dedup_tag_ids, like_pattern};
use crate::models::card_request::{CardRequest, CardRequestStatus, CreateCardRequest};
use crate::models::link::{CreateLinkRequest, Link, UpdateLinkRequest};
use crate::models::tag::{REQUEST_TAG_COLOR, REQUEST_TAG_NAME};
use crate::models::user::{CardAccessUser, CreateUserRequest, UpdateUserRequest, User, UserCredentials};
use crate::models::{Card, CardFilter, CardInput, CardWithTags, Tag, TagInput};
use crate::Result;

// Shared column lists. Nullable-with-default columns are coalesced so old
// rows decode into the non-optional model fields.
const USER_COLUMNS: &str = "id, username, COALESCE(is_admin, FALSE) AS is_admin, created_at";

const CARD_WITH_TAGS_SELECT: &str = r#"
    SELECT c.id, c.title, c.description, c.icon, c.color, c.thumbnail_url, c.created_at, c.updated_at,
           COALESCE(ARRAY_AGG(ct.tag_id ORDER BY ct.tag_id) FILTER (WHERE ct.tag_id IS NOT NULL), '{}') AS tag_ids
    FROM cards c
    LEFT JOIN card_tags ct ON ct.card_id = c.id
"#;

const LINK_COLUMNS: &str = "id, card_id, title, url, COALESCE(order_index, 0) AS order_index, created_at";

const REQUEST_SELECT: &str = r#"
    SELECT cr.id, cr.title, cr.description, cr.icon, cr.thumbnail_url, cr.requested_by, cr.card_id,
           COALESCE(cr.status, 'pending') AS status, cr.created_at,
           u.username AS requested_by_username
    FROM card_requests cr
    LEFT JOIN users u ON cr.requested_by = u.id
"#;

// Same mapping as `CardRequestStatus::from_stored`, so filtering agrees with
// what listed rows report.
const REQUEST_STATUS_CLASS: &str = "CASE LOWER(TRIM(COALESCE(cr.status, 'pending'))) \
     WHEN 'approved' THEN 'approved' WHEN 'rejected' THEN 'rejected' ELSE 'pending' END";

const INSERT_CARD_TAGS: &str =
    "INSERT INTO card_tags (card_id, tag_id) SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING";

const CARD_TAG_IDS: &str = "SELECT tag_id FROM card_tags WHERE card_id = $1 ORDER BY tag_id";

// PostgreSQL repositories share one connection manager
pub struct PostgresDatabase {
    pub manager: Arc<ConnectionManager>,
}

impl PostgresDatabase {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn user_repo(&self) -> PostgresUserRepository {
        PostgresUserRepository { manager: self.manager.clone() }
    }

    pub fn card_repo(&self) -> PostgresCardRepository {
        PostgresCardRepository { manager: self.manager.clone() }
    }

    pub fn tag_repo(&self) -> PostgresTagRepository {
        PostgresTagRepository { manager: self.manager.clone() }
    }

    pub fn link_repo(&self) -> PostgresLinkRepository {
        PostgresLinkRepository { manager: self.manager.clone() }
    }

    pub fn access_repo(&self) -> PostgresAccessRepository {
        PostgresAccessRepository { manager: self.manager.clone() }
    }

    pub fn request_repo(&self) -> PostgresCardRequestRepository {
        PostgresCardRequestRepository { manager: self.manager.clone() }
    }
}

// PostgreSQL User Repository
pub struct PostgresUserRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move { sqlx::query_as::<_, User>(sql).fetch_all(&mut *conn).await })
            .await
    }

    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, User>(sql).bind(id).fetch_optional(&mut *conn).await
            })
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, UserCredentials>(
                    "SELECT id, username, password, COALESCE(is_admin, FALSE) AS is_admin FROM users WHERE username = $1",
                )
                .bind(username)
                .fetch_optional(&mut *conn)
                .await
            })
            .await
    }

    async fn create_user(&self, user: &CreateUserRequest) -> Result<User> {
        let password_hash = hash_password(&user.password)?;
        let password_hash = password_hash.as_str();
        let sql = format!(
            "INSERT INTO users (username, password, is_admin) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, User>(sql)
                    .bind(&user.username)
                    .bind(password_hash)
                    .bind(user.is_admin)
                    .fetch_one(&mut *conn)
                    .await
            })
            .await
    }

    async fn update_user(&self, id: i32, user: &UpdateUserRequest) -> Result<Option<User>> {
        let new_hash = user.password.as_deref().map(hash_password).transpose()?;
        let new_hash = new_hash.as_deref();
        let sql = format!(
            "UPDATE users SET username = $1, password = COALESCE($2, password), is_admin = $3 \
             WHERE id = $4 RETURNING {USER_COLUMNS}"
        );
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, User>(sql)
                    .bind(&user.username)
                    .bind(new_hash)
                    .bind(user.is_admin)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await
            })
            .await
    }

    async fn delete_user(&self, id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *conn).await
            })
            .await?;
        Ok(())
    }

    async fn count_admins(&self) -> Result<i64> {
        self.manager
            .run(|mut conn| async move {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_admin = TRUE")
                    .fetch_one(&mut *conn)
                    .await
            })
            .await
    }
}

// PostgreSQL Card Repository
pub struct PostgresCardRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl CardRepository for PostgresCardRepository {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<CardWithTags>> {
        let search = filter.search.as_deref().map(like_pattern);
        let search = search.as_deref();
        let tag_ids = &filter.tag_ids;
        let sql = format!(
            "{CARD_WITH_TAGS_SELECT}
             WHERE ($1::text IS NULL OR c.title ILIKE $1 OR c.description ILIKE $1)
               AND (cardinality($2::int4[]) = 0
                    OR EXISTS (SELECT 1 FROM card_tags f WHERE f.card_id = c.id AND f.tag_id = ANY($2)))
             GROUP BY c.id
             ORDER BY c.id ASC"
        );
        let sql = sql.as_str();

        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, CardWithTags>(sql)
                    .bind(search)
                    .bind(tag_ids)
                    .fetch_all(&mut *conn)
                    .await
            })
            .await
    }

    async fn get_card_by_id(&self, id: i32) -> Result<Option<CardWithTags>> {
        let sql = format!("{CARD_WITH_TAGS_SELECT} WHERE c.id = $1 GROUP BY c.id");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, CardWithTags>(sql).bind(id).fetch_optional(&mut *conn).await
            })
            .await
    }

    async fn create_card(&self, input: &CardInput) -> Result<CardWithTags> {
        let tag_ids = dedup_tag_ids(&input.tag_ids);
        let tag_ids = &tag_ids;

        self.manager
            .run(move |mut conn| async move {
                let mut tx = conn.begin().await?;

                let card = sqlx::query_as::<_, Card>(
                    "INSERT INTO cards (title, description, icon, color, thumbnail_url)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING id, title, description, icon, color, thumbnail_url, created_at, updated_at",
                )
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.icon)
                .bind(&input.color)
                .bind(&input.thumbnail_url)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(INSERT_CARD_TAGS).bind(card.id).bind(tag_ids).execute(&mut *tx).await?;
                let tag_ids = sqlx::query_scalar::<_, i32>(CARD_TAG_IDS)
                    .bind(card.id)
                    .fetch_all(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(CardWithTags { card, tag_ids })
            })
            .await
    }

    async fn update_card(&self, id: i32, input: &CardInput) -> Result<Option<CardWithTags>> {
        let tag_ids = dedup_tag_ids(&input.tag_ids);
        let tag_ids = &tag_ids;

        self.manager
            .run(move |mut conn| async move {
                let mut tx = conn.begin().await?;

                let card = sqlx::query_as::<_, Card>(
                    "UPDATE cards
                     SET title = $1, description = $2, icon = $3, color = $4, thumbnail_url = $5,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = $6
                     RETURNING id, title, description, icon, color, thumbnail_url, created_at, updated_at",
                )
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.icon)
                .bind(&input.color)
                .bind(&input.thumbnail_url)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

                let Some(card) = card else {
                    return Ok(None);
                };

                sqlx::query("DELETE FROM card_tags WHERE card_id = $1").bind(id).execute(&mut *tx).await?;
                sqlx::query(INSERT_CARD_TAGS).bind(id).bind(tag_ids).execute(&mut *tx).await?;
                let tag_ids = sqlx::query_scalar::<_, i32>(CARD_TAG_IDS).bind(id).fetch_all(&mut *tx).await?;

                tx.commit().await?;
                Ok(Some(CardWithTags { card, tag_ids }))
            })
            .await
    }

    async fn delete_card(&self, id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query("DELETE FROM cards WHERE id = $1").bind(id).execute(&mut *conn).await
            })
            .await?;
        Ok(())
    }
}

// PostgreSQL Tag Repository
pub struct PostgresTagRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.manager
            .run(|mut conn| async move {
                sqlx::query_as::<_, Tag>("SELECT id, name, color, created_at FROM tags ORDER BY name ASC")
                    .fetch_all(&mut *conn)
                    .await
            })
            .await
    }

    async fn get_tag_by_id(&self, id: i32) -> Result<Option<Tag>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Tag>("SELECT id, name, color, created_at FROM tags WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await
            })
            .await
    }

    async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Tag>("SELECT id, name, color, created_at FROM tags WHERE name = $1")
                    .bind(name)
                    .fetch_optional(&mut *conn)
                    .await
            })
            .await
    }

    async fn create_tag(&self, tag: &TagInput) -> Result<Tag> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Tag>(
                    "INSERT INTO tags (name, color) VALUES ($1, $2) RETURNING id, name, color, created_at",
                )
                .bind(&tag.name)
                .bind(&tag.color)
                .fetch_one(&mut *conn)
                .await
            })
            .await
    }

    async fn update_tag(&self, id: i32, tag: &TagInput) -> Result<Option<Tag>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Tag>(
                    "UPDATE tags SET name = $1, color = $2 WHERE id = $3 RETURNING id, name, color, created_at",
                )
                .bind(&tag.name)
                .bind(&tag.color)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await
            })
            .await
    }

    async fn delete_tag(&self, id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query("DELETE FROM tags WHERE id = $1").bind(id).execute(&mut *conn).await
            })
            .await?;
        Ok(())
    }
}

// PostgreSQL Link Repository
pub struct PostgresLinkRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl LinkRepository for PostgresLinkRepository {
    async fn list_links_by_card(&self, card_id: i32) -> Result<Vec<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE card_id = $1 ORDER BY order_index ASC, id ASC");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Link>(sql).bind(card_id).fetch_all(&mut *conn).await
            })
            .await
    }

    async fn get_link_by_id(&self, id: i32) -> Result<Option<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Link>(sql).bind(id).fetch_optional(&mut *conn).await
            })
            .await
    }

    async fn create_link(&self, link: &CreateLinkRequest) -> Result<Link> {
        let sql = format!(
            "INSERT INTO links (card_id, title, url, order_index) VALUES ($1, $2, $3, $4) RETURNING {LINK_COLUMNS}"
        );
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Link>(sql)
                    .bind(link.card_id)
                    .bind(&link.title)
                    .bind(&link.url)
                    .bind(link.order_index)
                    .fetch_one(&mut *conn)
                    .await
            })
            .await
    }

    async fn update_link(&self, id: i32, link: &UpdateLinkRequest) -> Result<Option<Link>> {
        let sql = format!(
            "UPDATE links SET title = $1, url = $2, order_index = $3 WHERE id = $4 RETURNING {LINK_COLUMNS}"
        );
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, Link>(sql)
                    .bind(&link.title)
                    .bind(&link.url)
                    .bind(link.order_index)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await
            })
            .await
    }

    async fn delete_link(&self, id: i32) -> Result<Option<Vec<Link>>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE card_id = $1 ORDER BY order_index ASC, id ASC");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                let mut tx = conn.begin().await?;

                let card_id = sqlx::query_scalar::<_, i32>("DELETE FROM links WHERE id = $1 RETURNING card_id")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
                let Some(card_id) = card_id else {
                    return Ok(None);
                };

                let remaining = sqlx::query_as::<_, Link>(sql).bind(card_id).fetch_all(&mut *tx).await?;
                tx.commit().await?;
                Ok(Some(remaining))
            })
            .await
    }
}

// PostgreSQL Card Access Repository
pub struct PostgresAccessRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn has_grant(&self, user_id: i32, card_id: i32) -> Result<bool> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM card_user_access WHERE user_id = $1 AND card_id = $2)",
                )
                .bind(user_id)
                .bind(card_id)
                .fetch_one(&mut *conn)
                .await
            })
            .await
    }

    async fn grant(&self, card_id: i32, user_id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM card_user_access WHERE card_id = $1 AND user_id = $2)",
                )
                .bind(card_id)
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?;

                if !exists {
                    // a concurrent grant may still win the race
                    sqlx::query(
                        "INSERT INTO card_user_access (card_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                    )
                    .bind(card_id)
                    .bind(user_id)
                    .execute(&mut *conn)
                    .await?;
                }
                Ok(())
            })
            .await
    }

    async fn revoke(&self, card_id: i32, user_id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query("DELETE FROM card_user_access WHERE card_id = $1 AND user_id = $2")
                    .bind(card_id)
                    .bind(user_id)
                    .execute(&mut *conn)
                    .await
            })
            .await?;
        Ok(())
    }

    async fn list_card_users(&self, card_id: i32) -> Result<Vec<CardAccessUser>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, CardAccessUser>(
                    "SELECT u.id, u.username, COALESCE(u.is_admin, FALSE) AS is_admin, cua.created_at
                     FROM card_user_access cua
                     JOIN users u ON cua.user_id = u.id
                     WHERE cua.card_id = $1
                     ORDER BY u.username ASC",
                )
                .bind(card_id)
                .fetch_all(&mut *conn)
                .await
            })
            .await
    }

    async fn list_user_cards(&self, user_id: i32) -> Result<Vec<i32>> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_scalar::<_, i32>(
                    "SELECT card_id FROM card_user_access WHERE user_id = $1 ORDER BY card_id",
                )
                .bind(user_id)
                .fetch_all(&mut *conn)
                .await
            })
            .await
    }
}

// PostgreSQL Card Request Repository
pub struct PostgresCardRequestRepository {
    manager: Arc<ConnectionManager>,
}

#[async_trait]
impl CardRequestRepository for PostgresCardRequestRepository {
    async fn list_requests(&self, status: Option<CardRequestStatus>) -> Result<Vec<CardRequest>> {
        let status = status.map(CardRequestStatus::as_str);
        let sql = format!(
            "{REQUEST_SELECT} WHERE ($1::text IS NULL OR {REQUEST_STATUS_CLASS} = $1) ORDER BY cr.created_at DESC, cr.id DESC"
        );
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, CardRequest>(sql).bind(status).fetch_all(&mut *conn).await
            })
            .await
    }

    async fn get_request_by_id(&self, id: i32) -> Result<Option<CardRequest>> {
        let sql = format!("{REQUEST_SELECT} WHERE cr.id = $1");
        let sql = sql.as_str();
        self.manager
            .run(move |mut conn| async move {
                sqlx::query_as::<_, CardRequest>(sql).bind(id).fetch_optional(&mut *conn).await
            })
            .await
    }

    async fn create_request_with_card(
        &self,
        request: &CreateCardRequest,
        requested_by: i32,
        card_title: &str,
    ) -> Result<CardRequest> {
        let select = format!("{REQUEST_SELECT} WHERE cr.id = $1");
        let select = select.as_str();

        self.manager
            .run(move |mut conn| async move {
                let mut tx = conn.begin().await?;

                let request_id = sqlx::query_scalar::<_, i32>(
                    "INSERT INTO card_requests (title, description, icon, thumbnail_url, requested_by, status)
                     VALUES ($1, $2, $3, $4, $5, 'pending')
                     RETURNING id",
                )
                .bind(&request.title)
                .bind(&request.description)
                .bind(&request.icon)
                .bind(&request.thumbnail_url)
                .bind(requested_by)
                .fetch_one(&mut *tx)
                .await?;

                let tag_id = sqlx::query_scalar::<_, i32>(
                    "INSERT INTO tags (name, color) VALUES ($1, $2)
                     ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                     RETURNING id",
                )
                .bind(REQUEST_TAG_NAME)
                .bind(REQUEST_TAG_COLOR)
                .fetch_one(&mut *tx)
                .await?;

                let card_id = sqlx::query_scalar::<_, i32>(
                    "INSERT INTO cards (title, description, icon, thumbnail_url) VALUES ($1, $2, $3, $4) RETURNING id",
                )
                .bind(card_title)
                .bind(&request.description)
                .bind(&request.icon)
                .bind(&request.thumbnail_url)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query("INSERT INTO card_tags (card_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                    .bind(card_id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query("UPDATE card_requests SET card_id = $1 WHERE id = $2")
                    .bind(card_id)
                    .bind(request_id)
                    .execute(&mut *tx)
                    .await?;

                let created = sqlx::query_as::<_, CardRequest>(select)
                    .bind(request_id)
                    .fetch_one(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(created)
            })
            .await
    }

    async fn update_request_status(&self, id: i32, status: CardRequestStatus) -> Result<Option<CardRequest>> {
        let select = format!("{REQUEST_SELECT} WHERE cr.id = $1");
        let select = select.as_str();
        self.manager
            .run(move |mut conn| async move {
                let updated = sqlx::query("UPDATE card_requests SET status = $1 WHERE id = $2")
                    .bind(status.as_str())
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                if updated.rows_affected() == 0 {
                    return Ok(None);
                }
                sqlx::query_as::<_, CardRequest>(select).bind(id).fetch_optional(&mut *conn).await
            })
            .await
    }

    async fn delete_request(&self, id: i32) -> Result<()> {
        self.manager
            .run(move |mut conn| async move {
                sqlx::query("DELETE FROM card_requests WHERE id = $1").bind(id).execute(&mut *conn).await
            })
            .await?;
        Ok(())
    }
}
