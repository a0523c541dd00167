use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Database unreachable: {0}")]
    TransientConnectivity(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Database error: {message}")]
    DatabaseError { message: String, code: Option<String> },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn database(message: impl Into<String>) -> Self {
        AppError::DatabaseError { message: message.into(), code: None }
    }

    /// Only connectivity failures (refused, timed out, unresolvable host) are
    /// worth retrying; everything else is deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientConnectivity(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ConfigurationMissing(_)
            | AppError::InvalidConfiguration(_)
            | AppError::TransientConnectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidReference(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError { .. } | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show any client. Store-level failures are reduced to a
    /// generic sentence; the full text only goes out as `detail` in development.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ConfigurationMissing(_) | AppError::InvalidConfiguration(_) => {
                "Database is not configured".to_string()
            }
            AppError::TransientConnectivity(_) => "Database temporarily unavailable".to_string(),
            AppError::Conflict(_) => "A record with the same unique value already exists".to_string(),
            AppError::InvalidReference(_) => "Referenced record does not exist".to_string(),
            AppError::DatabaseError { .. } => "Database operation failed".to_string(),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
        }
    }

    fn from_database_code(code: Option<&str>, message: &str) -> Self {
        match code {
            Some(UNIQUE_VIOLATION) => AppError::Conflict(message.to_string()),
            Some(FOREIGN_KEY_VIOLATION) => AppError::InvalidReference(message.to_string()),
            other => {
                tracing::error!("❌ DATABASE: query failed (code {}): {}", other.unwrap_or("none"), message);
                AppError::DatabaseError {
                    message: message.to_string(),
                    code: other.map(str::to_string),
                }
            }
        }
    }
}

fn is_transient_io(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::TimedOut => true,
        _ => {
            // DNS failures surface as uncategorized io errors
            let text = err.to_string().to_lowercase();
            text.contains("failed to lookup address")
                || text.contains("name or service not known")
                || text.contains("no such host")
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(io) if is_transient_io(io) => {
                AppError::TransientConnectivity(err.to_string())
            }
            sqlx::Error::PoolTimedOut => AppError::TransientConnectivity(err.to_string()),
            sqlx::Error::Database(db) => {
                AppError::from_database_code(db.code().as_deref(), db.message())
            }
            _ => AppError::database(err.to_string()),
        }
    }
}

/// Response extension describing a rendered error, so outer middleware can
/// decide whether to expose diagnostic detail.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    pub status: StatusCode,
    pub message: String,
    pub detail: String,
}

impl ErrorBody {
    pub fn into_response_with_detail(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16(),
            "detail": self.detail,
        }));
        (self.status, body).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.public_message();

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorBody {
            status,
            message: error_message,
            detail: self.to_string(),
        });
        response
    }
}

// Convenient Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn refused_and_timed_out_connections_are_transient() {
        let refused = AppError::from(sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)));
        let timed_out = AppError::from(sqlx::Error::Io(io::Error::from(io::ErrorKind::TimedOut)));
        assert!(refused.is_transient());
        assert!(timed_out.is_transient());
        assert!(AppError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn unresolvable_host_is_transient() {
        let dns = io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        );
        assert!(AppError::from(sqlx::Error::Io(dns)).is_transient());
    }

    #[test]
    fn other_failures_are_not_transient() {
        let reset = AppError::from(sqlx::Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!reset.is_transient());
        assert!(!AppError::from(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn sqlstate_codes_map_to_distinct_variants() {
        assert!(matches!(
            AppError::from_database_code(Some("23505"), "duplicate key"),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from_database_code(Some("23503"), "violates foreign key"),
            AppError::InvalidReference(_)
        ));
        match AppError::from_database_code(Some("42601"), "syntax error") {
            AppError::DatabaseError { code, .. } => assert_eq!(code.as_deref(), Some("42601")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidReference("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::database("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::ConfigurationMissing("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_messages_are_not_public() {
        let err = AppError::from_database_code(Some("23505"), "duplicate key value violates unique constraint \"users_username_key\"");
        assert!(!err.public_message().contains("users_username_key"));
        assert!(err.to_string().contains("users_username_key"));
    }

    #[test]
    fn response_carries_error_body_extension() {
        let response = AppError::NotFound("Card not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.extensions().get::<ErrorBody>().cloned();
        assert_eq!(body.map(|b| b.message), Some("Card not found".to_string()));
    }
}
