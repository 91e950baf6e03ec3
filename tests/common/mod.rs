//! 测试公共模块
//! 提供测试配置、内存存储与请求辅助函数
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use student_api::{
    auth::ManualClock,
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
    middleware::AppState,
    repository::{InMemoryCredentialStore, InMemoryStudentStore},
    routes,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: Secret::new("postgresql://localhost/unused".to_string()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            token_ttl_secs: 1800,
            cookie_secure: false,
            revocation_enabled: false,
            // 测试中使用最低成本，保持测试快速
            password_hash_memory_kib: 1024,
            password_hash_iterations: 1,
            password_hash_parallelism: 1,
        },
    }
}

/// 测试应用：路由 + 可控时钟 + 内存存储
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub students: Arc<InMemoryStudentStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(create_test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        ));
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let students = Arc::new(InMemoryStudentStore::new());

        let state = AppState::new(config, credentials.clone(), students.clone(), clock.clone())
            .expect("Failed to build test app state");
        let router = routes::create_router(Arc::new(state));

        Self {
            router,
            clock,
            credentials,
            students,
        }
    }

    /// 发送请求并解析 JSON 响应体（空响应体解析为 Null）
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.send(json_request(
            "POST",
            "/login-root",
            &serde_json::json!({ "username": username, "password": password }),
            None,
        ))
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send(json_request(
            "POST",
            "/auth",
            &serde_json::json!({ "username": username, "password": password }),
            None,
        ))
        .await
    }

    /// 注册并登录，返回令牌
    pub async fn login_token(&self, username: &str, password: &str) -> String {
        let registered = self.register(username, password).await;
        assert_eq!(registered.status, StatusCode::OK, "{}", registered.body);

        let response = self.login(username, password).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

/// 构建带 JSON 请求体的请求，可选 Bearer 令牌
pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// 构建无请求体的请求，可选 Bearer 令牌
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}
