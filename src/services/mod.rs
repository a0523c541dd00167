pub mod access_service;
pub mod card_request_service;
pub mod catalog_service;
pub mod user_service;

// Re-export services for convenience
pub use access_service::AccessService;
pub use card_request_service::CardRequestService;
pub use catalog_service::CatalogService;
pub use user_service::UserService;
