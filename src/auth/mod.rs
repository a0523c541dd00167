pub mod jwt;
pub mod middleware;
pub mod password;

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::User;
use crate::{AppError, Result};
pub use jwt::{Claims, JwtService};

/// Issues and checks bearer tokens. Each request is authenticated on its own;
/// logout revokes the presented token until it would have expired anyway.
pub struct AuthService {
    jwt: JwtService,
    revoked: Mutex<HashMap<String, i64>>, // jti -> exp
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            jwt: JwtService::new(jwt_secret, Duration::hours(token_ttl_hours)),
            revoked: Mutex::new(HashMap::new()),
        }
    }

    pub fn generate_token(&self, user: &User) -> Result<String> {
        self.jwt.encode_token(user.id, &user.username)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let claims = self.jwt.decode_token(token)?;
        let revoked = self
            .revoked
            .lock()
            .map_err(|_| AppError::InternalError("revocation list lock poisoned".to_string()))?;
        if revoked.contains_key(&claims.jti) {
            return Err(AppError::AuthError("Session ended".to_string()));
        }
        Ok(claims)
    }

    pub fn revoke(&self, claims: &Claims) -> Result<()> {
        let now = Utc::now().timestamp();
        let mut revoked = self
            .revoked
            .lock()
            .map_err(|_| AppError::InternalError("revocation list lock poisoned".to_string()))?;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp);
        Ok(())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        password::verify_password(password, hash)
    }
}
