//! Password hashing and verification using Argon2id

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// Password hasher (Argon2id, v0x13, crate default parameters)
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::debug!("Failed to parse password hash: {:?}", e);
            AppError::Internal(format!("Failed to parse password hash: {}", e))
        })?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Unauthorized)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Password complexity rules
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl PasswordPolicy {
    pub fn from_config(security: &SecurityConfig) -> Self {
        Self {
            min_length: security.password_min_length,
            require_uppercase: security.password_require_uppercase,
            require_lowercase: security.password_require_lowercase,
            require_digit: security.password_require_digit,
            require_special: security.password_require_special,
        }
    }

    /// Returns every rule the password breaks; empty means acceptable
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut out = Vec::new();

        if password.chars().count() < self.min_length {
            out.push(format!(
                "Passwords must be at least {} characters.",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            out.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            out.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            out.push("Passwords must have at least one digit ('0'-'9').".to_string());
        }
        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            out.push("Passwords must have at least one non alphanumeric character.".to_string());
        }

        out
    }
}
