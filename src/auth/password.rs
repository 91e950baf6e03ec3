//! Password hashing and verification using Argon2id

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher as _,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Minimum password length accepted at registration
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Password hasher with configurable parameters
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create hasher with explicit cost parameters
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            AppError::Config(format!("Invalid Argon2 params: {}", e))
        })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Create hasher from the security section of the config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::with_params(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            config.password_hash_parallelism,
        )
    }

    /// Hash a password on the current thread
    pub fn hash_blocking(&self, password: &str) -> Result<String, AppError> {
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

    /// Verify a password against a stored hash on the current thread.
    ///
    /// `Ok(false)` means the password does not match. A hash that cannot be
    /// parsed or a library failure is an internal error.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("Failed to parse password hash: {:?}", e);
            AppError::Internal(format!("Failed to parse password hash: {}", e))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => {
                tracing::error!("Failed to verify password: {:?}", e);
                Err(AppError::Internal(format!("Failed to verify password: {}", e)))
            }
        }
    }

    /// Hash on the blocking pool
    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password)).await?
    }

    /// Verify on the blocking pool
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash)).await?
    }
}

/// Registration password policy: at least eight ASCII letters and digits,
/// with at least one digit, one lowercase and one uppercase letter.
pub fn meets_password_policy(password: &str) -> bool {
    password.len() >= PASSWORD_MIN_LENGTH
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
}
