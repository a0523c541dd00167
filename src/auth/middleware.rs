// Request authentication extractors and cross-cutting middleware
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::Claims;
use crate::error::ErrorBody;
use crate::models::User;
use crate::{AppError, AppState};

/// The authenticated caller. The user row is re-read on every request, so a
/// deleted account or a revoked admin flag takes effect immediately.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

/// An authenticated caller with the admin flag set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

/// The caller if a valid token was presented, otherwise `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid authorization header format".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::AuthError("Authorization header must start with 'Bearer '".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.auth_service.verify_token(token)?;
        let user = state
            .user_service
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        Ok(CurrentUser { user, claims })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_admin {
            return Err(AppError::Forbidden("Administrator permissions required".to_string()));
        }
        Ok(AdminUser(current))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(current) => Ok(MaybeUser(Some(current))),
            Err(AppError::AuthError(_)) => Ok(MaybeUser(None)),
            Err(other) => Err(other),
        }
    }
}

/// Answers 503 once shutdown has begun.
pub async fn reject_during_shutdown(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.is_shutting_down() {
        let body = Json(json!({ "error": "Server is shutting down", "status": 503 }));
        return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
    }
    next.run(request).await
}

/// Adds the underlying error text to error bodies outside production.
pub async fn attach_error_detail(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if state.config.environment.is_production() {
        return response;
    }
    match response.extensions().get::<ErrorBody>().cloned() {
        Some(body) => body.into_response_with_detail(),
        None => response,
    }
}
