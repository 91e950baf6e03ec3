//! HTTP 中间件与应用状态

use crate::{
    auth::{AuthGate, Clock, JwtService, PasswordHasher, RevocationList},
    config::AppConfig,
    error::AppError,
    repository::{CredentialStore, StudentStore},
    services::AuthService,
};
use axum::{extract::Request, http::HeaderMap, http::HeaderValue, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// Shared by every handler behind an `Arc`; nothing in here is mutated after
/// startup except the optional revocation list inside the gate.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth_service: Arc<AuthService>,
    pub gate: Arc<AuthGate>,
    pub students: Arc<dyn StudentStore>,
}

impl AppState {
    /// 由配置与存储构建完整状态
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        students: Arc<dyn StudentStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let jwt = Arc::new(JwtService::from_config(&config.security, clock.clone())?);

        let mut gate = AuthGate::new(jwt.clone(), clock);
        if config.security.revocation_enabled {
            gate = gate.with_revocations(Arc::new(RevocationList::new(jwt.token_ttl())));
            tracing::info!("Token revocation list enabled");
        }
        let gate = Arc::new(gate);

        let hasher = PasswordHasher::from_config(&config.security)?;
        let auth_service = Arc::new(AuthService::new(credentials, hasher, jwt, gate.clone())?);

        Ok(Self {
            config,
            auth_service,
            gate,
            students,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            _ => "OTHER",
        };
        let status_code = match status {
            200 => "200",
            400 => "400",
            401 => "401",
            404 => "404",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_passthrough() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "abc-123".parse().unwrap());
        assert_eq!(extract_or_generate_trace_id(&headers), "abc-123");
    }

    #[test]
    fn test_trace_id_generated() {
        let id = extract_or_generate_trace_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
