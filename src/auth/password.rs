// Salted one-way password hashing
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;

use crate::{AppError, Result};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

/// bcrypt hashes (`$2a$`, `$2b$`, `$2x$`, `$2y$`) written by earlier versions of the app.
pub fn is_legacy_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}

/// `Ok(false)` for a wrong password and for hashes this build cannot read.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    if is_legacy_hash(hash) {
        return match bcrypt::verify(password, hash) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                tracing::warn!("⚠️ AUTH: stored bcrypt hash could not be read ({}); reset this password", e);
                Ok(false)
            }
        };
    }

    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("⚠️ AUTH: stored password hash is not in PHC format ({}); reset this password", e);
            return Ok(false);
        }
    };
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
