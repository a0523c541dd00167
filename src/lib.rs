// Library modules for the link organizer backend
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod utils;

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

// Re-export commonly used types
pub use config::{AppConfig, Environment};
pub use error::{AppError, Result};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DatabaseClient,
    pub user_service: Arc<services::UserService>,
    pub catalog_service: Arc<services::CatalogService>,
    pub access_service: Arc<services::AccessService>,
    pub card_request_service: Arc<services::CardRequestService>,
    pub auth_service: Arc<auth::AuthService>,
    pub started_at: Instant,
    shutting_down: Arc<AtomicBool>,
    bound_port: Arc<AtomicU16>,
}

impl AppState {
    /// State backed by PostgreSQL. The database is not contacted here.
    pub fn new(config: AppConfig) -> Self {
        let db = db::DatabaseClient::new(&config);
        Self::with_database(config, db)
    }

    pub fn with_database(config: AppConfig, db: db::DatabaseClient) -> Self {
        // Initialize services with repository dependencies
        let auth_service = Arc::new(auth::AuthService::new(&config.jwt_secret, config.token_ttl_hours));
        let user_service = Arc::new(services::UserService::new(db.user_repo.clone()));
        let catalog_service = Arc::new(services::CatalogService::new(
            db.card_repo.clone(),
            db.tag_repo.clone(),
            db.link_repo.clone(),
        ));
        let access_service = Arc::new(services::AccessService::new(
            db.access_repo.clone(),
            db.card_repo.clone(),
            db.user_repo.clone(),
        ));
        let card_request_service = Arc::new(services::CardRequestService::new(db.request_repo.clone()));

        Self {
            config,
            db,
            user_service,
            catalog_service,
            access_service,
            card_request_service,
            auth_service,
            started_at: Instant::now(),
            shutting_down: Arc::new(AtomicBool::new(false)),
            bound_port: Arc::new(AtomicU16::new(0)),
        }
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn set_bound_port(&self, port: u16) {
        self.bound_port.store(port, Ordering::SeqCst);
    }

    pub fn bound_port(&self) -> Option<u16> {
        match self.bound_port.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }
}
