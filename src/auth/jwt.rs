//! JWT token issuance and signature verification
//! One token type: a signed, time-limited claim over the username and role

use crate::{
    auth::{clock::Clock, gate::DenyReason},
    config::SecurityConfig,
    error::AppError,
    models::user::Role,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Minimum HS256 secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Username
    pub username: String,

    /// User role
    pub role: Role,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Issued at (unix milliseconds); orders tokens minted within one second
    pub iat_ms: i64,

    /// Expiration (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.iat_ms)
            .single()
            .unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    /// Create JWT service from an explicit secret
    pub fn new(
        secret: &Secret<String>,
        token_ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let secret = secret.expose_secret();

        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Config(format!(
                "JWT secret too short (min {} chars)",
                MIN_SECRET_LEN
            )));
        }

        // Expiry is checked against the injected clock by the gate, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl: Duration::seconds(token_ttl_secs as i64),
            clock,
        })
    }

    /// Create JWT service from config
    pub fn from_config(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        Self::new(&config.jwt_secret, config.token_ttl_secs, clock)
    }

    /// Lifetime of every issued token
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Sign a new claim for `username`, valid from now until now + ttl
    pub fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AppError> {
        let now = self.clock.now();
        let expiration = now + self.token_ttl;

        let claims = Claims {
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            exp: expiration.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode token: {:?}", e);
                AppError::Internal(format!("Failed to encode token: {}", e))
            })?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify the signature and decode the claims. Expiry is not checked here.
    pub fn verify_signature(&self, token: &str) -> Result<Claims, DenyReason> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "Token signature verification failed");
                DenyReason::InvalidSignature
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::{ManualClock, SystemClock};

    fn secret(s: &str) -> Secret<String> {
        Secret::new(s.to_string())
    }

    fn service() -> JwtService {
        JwtService::new(
            &secret("test_secret_key_32_characters_long!"),
            1800,
            Arc::new(SystemClock),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let service = service();
        let issued = service.issue("alice", Role::User).unwrap();

        let claims = service.verify_signature(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expiry_uses_injected_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let service =
            JwtService::new(&secret("test_secret_key_32_characters_long!"), 1800, clock).unwrap();

        let issued = service.issue("alice", Role::Admin).unwrap();
        assert_eq!(issued.claims.issued_at(), start);
        assert_eq!(issued.claims.iat_ms, issued.claims.iat * 1000);
        assert_eq!(issued.claims.expires_at(), start + Duration::minutes(30));
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = JwtService::new(&secret("short"), 1800, Arc::new(SystemClock));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_other_secret_rejected() {
        let issued = service().issue("alice", Role::User).unwrap();
        let other = JwtService::new(
            &secret("another_secret_key_32_characters_!!"),
            1800,
            Arc::new(SystemClock),
        )
        .unwrap();

        assert_eq!(
            other.verify_signature(&issued.token),
            Err(DenyReason::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            service().verify_signature("invalid_token"),
            Err(DenyReason::InvalidSignature)
        );
    }
}
