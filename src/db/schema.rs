//! Idempotent schema initialization.
//!
//! Every statement is safe to run against an empty database, a fully
//! initialized one, or anything in between. Nothing is ever dropped or
//! renamed; older databases gain missing columns through guarded `ALTER`s.

use crate::config::AdminBootstrap;
use crate::db::connection::ConnectionManager;
use crate::db::repository::UserRepository;
use crate::models::tag::{REQUEST_TAG_COLOR, REQUEST_TAG_NAME};
use crate::models::user::CreateUserRequest;
use crate::{AppError, Result};

/// Table definitions in foreign-key order: parents before children.
pub const TABLES: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(255) UNIQUE NOT NULL,
            password VARCHAR(255) NOT NULL,
            is_admin BOOLEAN DEFAULT FALSE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "cards",
        "CREATE TABLE IF NOT EXISTS cards (
            id SERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            description TEXT,
            icon VARCHAR(255),
            color VARCHAR(50),
            thumbnail_url TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "links",
        "CREATE TABLE IF NOT EXISTS links (
            id SERIAL PRIMARY KEY,
            card_id INTEGER NOT NULL,
            title VARCHAR(255),
            url TEXT NOT NULL,
            order_index INTEGER DEFAULT 0,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        )",
    ),
    (
        "tags",
        "CREATE TABLE IF NOT EXISTS tags (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) UNIQUE NOT NULL,
            color VARCHAR(50),
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "card_tags",
        "CREATE TABLE IF NOT EXISTS card_tags (
            card_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (card_id, tag_id),
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
    ),
    (
        "card_user_access",
        "CREATE TABLE IF NOT EXISTS card_user_access (
            card_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (card_id, user_id),
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "card_requests",
        "CREATE TABLE IF NOT EXISTS card_requests (
            id SERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            description TEXT,
            icon VARCHAR(255),
            thumbnail_url TEXT,
            requested_by INTEGER,
            card_id INTEGER,
            status VARCHAR(50) DEFAULT 'pending',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (requested_by) REFERENCES users(id) ON DELETE SET NULL,
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE SET NULL
        )",
    ),
];

/// A column added after the first schema release.
pub struct ColumnMigration {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

pub const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
    ColumnMigration { table: "cards", column: "thumbnail_url", definition: "TEXT" },
    ColumnMigration {
        table: "card_requests",
        column: "card_id",
        definition: "INTEGER REFERENCES cards(id) ON DELETE SET NULL",
    },
];

pub const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_links_card_id ON links(card_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_tags_card_id ON card_tags(card_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_tags_tag_id ON card_tags(tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_cards_title ON cards(title)",
    "CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)",
    "CREATE INDEX IF NOT EXISTS idx_card_user_access_card_id ON card_user_access(card_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_user_access_user_id ON card_user_access(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_card_requests_status ON card_requests(status)",
    "CREATE INDEX IF NOT EXISTS idx_card_requests_requested_by ON card_requests(requested_by)",
];

async fn execute(manager: &ConnectionManager, sql: &str) -> Result<()> {
    manager
        .run(move |mut conn| async move { sqlx::query(sql).execute(&mut *conn).await })
        .await?;
    Ok(())
}

async fn column_exists(manager: &ConnectionManager, table: &str, column: &str) -> Result<bool> {
    manager
        .run(move |mut conn| async move {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.columns
                    WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
                )",
            )
            .bind(table)
            .bind(column)
            .fetch_one(&mut *conn)
            .await
        })
        .await
}

async fn apply_column_migrations(manager: &ConnectionManager) -> Result<()> {
    for migration in COLUMN_MIGRATIONS {
        if column_exists(manager, migration.table, migration.column).await? {
            continue;
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            migration.table, migration.column, migration.definition
        );
        execute(manager, &sql).await?;
        tracing::info!("➕ SCHEMA: Added column {}.{}", migration.table, migration.column);
    }
    Ok(())
}

async fn seed_request_tag(manager: &ConnectionManager) -> Result<()> {
    let existing = manager
        .run(|mut conn| async move {
            sqlx::query_scalar::<_, i32>("SELECT id FROM tags WHERE name = $1")
                .bind(REQUEST_TAG_NAME)
                .fetch_optional(&mut *conn)
                .await
        })
        .await?;

    if existing.is_none() {
        manager
            .run(|mut conn| async move {
                sqlx::query("INSERT INTO tags (name, color) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                    .bind(REQUEST_TAG_NAME)
                    .bind(REQUEST_TAG_COLOR)
                    .execute(&mut *conn)
                    .await
            })
            .await?;
        tracing::info!("🏷️ SCHEMA: Reserved tag '{}' created", REQUEST_TAG_NAME);
    }
    Ok(())
}

/// Creates the configured administrator only while no administrator exists.
pub async fn bootstrap_admin(users: &dyn UserRepository, admin: &AdminBootstrap) -> Result<bool> {
    if !admin.enabled || users.count_admins().await? > 0 {
        return Ok(false);
    }

    let request = CreateUserRequest {
        username: admin.username.clone(),
        password: admin.password.clone(),
        is_admin: true,
    };
    match users.create_user(&request).await {
        Ok(user) => {
            tracing::info!("👤 SCHEMA: Default administrator '{}' created", user.username);
            Ok(true)
        }
        Err(AppError::Conflict(_)) => {
            tracing::warn!(
                "⚠️ SCHEMA: No administrator exists but user '{}' is taken; create one with the admin CLI",
                admin.username
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

pub async fn initialize_schema(manager: &ConnectionManager) -> Result<()> {
    tracing::info!("🔧 SCHEMA: Ensuring tables exist...");
    for (name, sql) in TABLES {
        execute(manager, sql).await?;
        tracing::debug!("   ✅ table {}", name);
    }

    apply_column_migrations(manager).await?;
    seed_request_tag(manager).await?;

    tracing::info!("📊 SCHEMA: Ensuring indexes exist...");
    for sql in INDEXES {
        execute(manager, sql).await?;
    }

    tracing::info!("✅ SCHEMA: Database schema ready");
    Ok(())
}
