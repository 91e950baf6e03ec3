//! Credential domain models

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Width of the `user_login.username` column
pub const USERNAME_MAX_LENGTH: usize = 64;

/// Usernames are ASCII letters only
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("valid regex"));

/// Role carried by a credential and its tokens
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Stored credential
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub user_id: i32,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Credential as returned to clients (never includes the hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialResponse {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl From<Credential> for CredentialResponse {
    fn from(credential: Credential) -> Self {
        Self {
            user_id: credential.user_id,
            username: credential.username,
            role: credential.role,
        }
    }
}

/// Register request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub fn is_valid_username(username: &str) -> bool {
    username.len() <= USERNAME_MAX_LENGTH && USERNAME_RE.is_match(username)
}
