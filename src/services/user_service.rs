use crate::auth::password::is_legacy_hash;
use crate::auth::AuthService;
use crate::db::repository::UserRepository;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User};
use crate::{AppError, Result};
use std::sync::Arc;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo.list_users().await
    }

    pub async fn get_user(&self, user_id: i32) -> Result<Option<User>> {
        self.user_repo.get_user_by_id(user_id).await
    }

    pub async fn create_user(&self, mut request: CreateUserRequest) -> Result<User> {
        request.username = request.username.trim().to_string();
        if request.username.is_empty() || request.password.is_empty() {
            return Err(AppError::ValidationError("Username and password are required".to_string()));
        }
        self.user_repo.create_user(&request).await
    }

    pub async fn update_user(&self, user_id: i32, mut request: UpdateUserRequest) -> Result<User> {
        request.username = request.username.trim().to_string();
        if request.username.is_empty() {
            return Err(AppError::ValidationError("Username is required".to_string()));
        }
        // an empty password field means "keep the current one"
        if request.password.as_deref().map_or(false, str::is_empty) {
            request.password = None;
        }

        self.user_repo
            .update_user(user_id, &request)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Users cannot delete their own account.
    pub async fn delete_user(&self, acting_user_id: i32, user_id: i32) -> Result<()> {
        if acting_user_id == user_id {
            return Err(AppError::ValidationError("You cannot delete your own user".to_string()));
        }
        self.user_repo.delete_user(user_id).await
    }

    pub async fn authenticate_user(&self, username: &str, password: &str, auth_service: &AuthService) -> Result<(User, String)> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::ValidationError("Username and password are required".to_string()));
        }

        let credentials = self.user_repo.get_user_by_username(username.trim()).await?
            .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

        if !auth_service.verify_password(password, &credentials.password_hash)? {
            return Err(AppError::AuthError("Invalid credentials".to_string()));
        }

        if is_legacy_hash(&credentials.password_hash) {
            self.upgrade_legacy_hash(&credentials.username, credentials.id, credentials.is_admin, password).await;
        }

        let user = User::from(credentials);
        let token = auth_service.generate_token(&user)?;
        tracing::info!("🔑 AUTH: User '{}' logged in", user.username);
        Ok((user, token))
    }

    /// Re-stores a verified bcrypt password as argon2. Failure only costs the
    /// upgrade; the login itself still succeeds.
    async fn upgrade_legacy_hash(&self, username: &str, user_id: i32, is_admin: bool, password: &str) {
        let update = UpdateUserRequest {
            username: username.to_string(),
            password: Some(password.to_string()),
            is_admin,
        };
        match self.user_repo.update_user(user_id, &update).await {
            Ok(_) => tracing::info!("🔐 AUTH: Upgraded legacy password hash for '{}'", username),
            Err(e) => tracing::warn!("⚠️ AUTH: Could not upgrade legacy password hash for '{}': {}", username, e),
        }
    }
}
