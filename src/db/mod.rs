pub mod connection;
pub mod mock;
pub mod postgres;
pub mod repository;
pub mod schema;
pub mod ssl;

// Database connection and state management
use std::sync::Arc;

use crate::config::{AdminBootstrap, AppConfig};
use crate::{AppError, Result};
use connection::{ConnectionManager, DatabaseHealth, RECONNECT_DELAY};
use mock::MockStore;
use postgres::PostgresDatabase;
use repository::{
    AccessRepository, CardRepository, CardRequestRepository, LinkRepository, TagRepository,
    UserRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    InMemory,
}

#[derive(Clone)]
pub struct DatabaseClient {
    pub kind: StorageKind,
    pub manager: Arc<ConnectionManager>,
    pub user_repo: Arc<dyn UserRepository>,
    pub card_repo: Arc<dyn CardRepository>,
    pub tag_repo: Arc<dyn TagRepository>,
    pub link_repo: Arc<dyn LinkRepository>,
    pub access_repo: Arc<dyn AccessRepository>,
    pub request_repo: Arc<dyn CardRequestRepository>,
}

impl DatabaseClient {
    /// Repositories backed by PostgreSQL. No connection is attempted here.
    pub fn new(config: &AppConfig) -> Self {
        let manager = Arc::new(ConnectionManager::new(config.database.clone(), config.environment));
        let database = PostgresDatabase::new(manager.clone());

        Self {
            kind: StorageKind::Postgres,
            manager,
            user_repo: Arc::new(database.user_repo()),
            card_repo: Arc::new(database.card_repo()),
            tag_repo: Arc::new(database.tag_repo()),
            link_repo: Arc::new(database.link_repo()),
            access_repo: Arc::new(database.access_repo()),
            request_repo: Arc::new(database.request_repo()),
        }
    }

    /// Repositories backed by a single in-memory store.
    pub fn in_memory(config: &AppConfig, store: Arc<MockStore>) -> Self {
        let manager = Arc::new(ConnectionManager::new(config.database.clone(), config.environment));

        Self {
            kind: StorageKind::InMemory,
            manager,
            user_repo: store.clone(),
            card_repo: store.clone(),
            tag_repo: store.clone(),
            link_repo: store.clone(),
            access_repo: store.clone(),
            request_repo: store,
        }
    }

    /// Probe connectivity, bring the schema up to date, then create the
    /// configured administrator if none exists yet.
    pub async fn initialize(&self, admin: &AdminBootstrap) -> Result<()> {
        if self.kind == StorageKind::Postgres {
            self.manager.test_connection().await?;
            schema::initialize_schema(&self.manager).await?;
        }

        schema::bootstrap_admin(self.user_repo.as_ref(), admin).await?;
        self.manager.mark_initialized();
        Ok(())
    }

    /// Runs `initialize` in the background, rebuilding the pool and trying
    /// again after a fixed delay until the reconnect budget is spent.
    pub fn spawn_initialization(&self, admin: AdminBootstrap) -> tokio::task::JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            loop {
                let err = match client.initialize(&admin).await {
                    Ok(()) => {
                        tracing::info!("✅ STARTUP: Database initialized");
                        return;
                    }
                    Err(e) => e,
                };

                if let AppError::ConfigurationMissing(_) | AppError::InvalidConfiguration(_) = err {
                    tracing::error!("❌ STARTUP: {}", err);
                    tracing::error!("   📋 Set DATABASE_URL (or DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD) and restart");
                    return;
                }

                log_initialization_failure(&err);

                let Some(attempt) = client.manager.next_reconnect_attempt() else {
                    tracing::error!(
                        "❌ STARTUP: Giving up on database initialization after {} reconnection attempts",
                        connection::MAX_RECONNECT_ATTEMPTS
                    );
                    return;
                };

                tracing::warn!(
                    "🔄 STARTUP: Reconnecting in {}s (attempt {}/{})",
                    RECONNECT_DELAY.as_secs(),
                    attempt,
                    connection::MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
                client.manager.recreate_pool();
            }
        })
    }

    pub async fn health_check(&self) -> DatabaseHealth {
        match self.kind {
            StorageKind::InMemory => DatabaseHealth::Healthy {
                pool_size: 0,
                idle_connections: 0,
                waiting_clients: 0,
            },
            StorageKind::Postgres => self.manager.health_check().await,
        }
    }

    pub async fn close(&self) {
        self.manager.close().await;
    }
}

fn log_initialization_failure(err: &AppError) {
    match err {
        AppError::TransientConnectivity(msg) => {
            tracing::error!("❌ STARTUP: Could not reach PostgreSQL: {}", msg);
            tracing::error!("   📋 Check that the server is running, the credentials are correct and the firewall allows the connection");
        }
        AppError::DatabaseError { message, code } => {
            tracing::error!(
                "❌ STARTUP: Database initialization failed: {} (code {})",
                message,
                code.as_deref().unwrap_or("none")
            );
        }
        other => tracing::error!("❌ STARTUP: Database initialization failed: {}", other),
    }
}
