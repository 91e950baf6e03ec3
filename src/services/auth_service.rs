//! 认证服务：注册、登录、登出

use crate::{
    auth::{
        gate::{AuthDecision, AuthGate},
        jwt::{IssuedToken, JwtService},
        password::{meets_password_policy, PasswordHasher},
    },
    error::AppError,
    models::{
        auth::LoginRequest,
        user::{is_valid_username, CredentialResponse, RegisterRequest, Role},
    },
    repository::CredentialStore,
};
use std::sync::Arc;

/// Successful login: the authenticated username and its signed token
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub username: String,
    pub issued: IssuedToken,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    jwt: Arc<JwtService>,
    gate: Arc<AuthGate>,
    // verified against when the username is unknown so both failures cost the same
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt: Arc<JwtService>,
        gate: Arc<AuthGate>,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash_blocking("dummy-password-for-timing")?;

        Ok(Self {
            credentials,
            hasher,
            jwt,
            gate,
            dummy_hash,
        })
    }

    pub fn jwt(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    /// 注册新用户
    pub async fn register(&self, req: RegisterRequest) -> Result<CredentialResponse, AppError> {
        let mut errors = Vec::new();
        if !is_valid_username(&req.username) {
            errors.push("invalid username".to_string());
        }
        if !meets_password_policy(&req.password) {
            errors.push("invalid password".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let password_hash = self.hasher.hash(req.password).await?;
        let credential = self
            .credentials
            .insert(&req.username, &password_hash, Role::User)
            .await?;

        tracing::info!(
            user_id = credential.user_id,
            username = %credential.username,
            "User registered"
        );

        Ok(CredentialResponse::from(credential))
    }

    /// 用户登录
    ///
    /// Unknown username and wrong password both end in
    /// [`AppError::Authentication`].
    pub async fn login(&self, req: LoginRequest) -> Result<LoginOutcome, AppError> {
        let credential = self.credentials.find_by_username(&req.username).await?;

        let hash = match &credential {
            Some(c) => c.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self.hasher.verify(req.password, hash).await?;

        let credential = match credential {
            Some(c) if matches => c,
            _ => {
                tracing::warn!(username = %req.username, "Login failed");
                return Err(AppError::Authentication);
            }
        };

        let issued = self.jwt.issue(&credential.username, credential.role)?;

        tracing::info!(username = %credential.username, "Login succeeded");

        Ok(LoginOutcome {
            username: credential.username,
            issued,
        })
    }

    /// 登出
    ///
    /// Only does server-side work when a revocation list is configured and the
    /// request still carries a valid token; otherwise the client just drops
    /// its cookie.
    pub fn logout(&self, tokens: &[String]) {
        let Some(revocations) = self.gate.revocations() else {
            return;
        };

        if let AuthDecision::Allowed(identity) = self.gate.authorize_any(tokens) {
            revocations.revoke(&identity.username, self.gate.clock().now());
        }
    }
}
