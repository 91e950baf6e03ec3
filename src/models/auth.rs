//! Authentication-related models

use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: String,
    pub token: String,
}

/// Logout / informational response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
