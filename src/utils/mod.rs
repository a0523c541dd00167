pub mod database_retry;
pub mod port_finder;

pub use database_retry::{retry_database_operation, DatabaseRetryConfig};
pub use port_finder::find_available_port;
