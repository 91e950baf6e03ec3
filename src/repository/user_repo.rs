//! Credential repository (数据库访问层)

use crate::{
    db,
    error::AppError,
    models::user::{Credential, Role},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence used by the auth controller: lookup and insert only
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 根据用户名查找凭据
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError>;

    /// 插入新凭据；用户名重复时返回校验错误
    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Credential, AppError>;
}

fn duplicate_username() -> AppError {
    AppError::validation("username already exists")
}

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT user_id, username, password_hash, role FROM user_login WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(credential)
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Credential, AppError> {
        sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO user_login (username, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING user_id, username, password_hash, role
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                duplicate_username()
            } else {
                AppError::Database(e)
            }
        })
    }
}

/// 内存凭据存储（测试与本地开发）
#[derive(Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<InMemoryCredentials>,
}

#[derive(Default)]
struct InMemoryCredentials {
    next_id: i32,
    by_username: HashMap<String, Credential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_username.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        Ok(self.inner.read().await.by_username.get(username).cloned())
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Credential, AppError> {
        let mut inner = self.inner.write().await;
        if inner.by_username.contains_key(username) {
            return Err(duplicate_username());
        }

        inner.next_id += 1;
        let credential = Credential {
            user_id: inner.next_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        inner
            .by_username
            .insert(username.to_string(), credential.clone());

        Ok(credential)
    }
}
