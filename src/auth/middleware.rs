//! JWT 认证中间件

use crate::{
    auth::gate::{AuthDecision, AuthGate, Identity},
    error::AppError,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// 携带令牌的 cookie 名
pub const TOKEN_COOKIE: &str = "jwt";

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext(pub Identity);

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized(crate::auth::gate::DenyReason::Missing))
    }
}

/// 收集候选令牌：jwt cookie 在前，Authorization 头在后
pub fn extract_tokens(headers: &HeaderMap) -> Vec<String> {
    extract_cookie_token(headers)
        .into_iter()
        .chain(extract_bearer_token(headers))
        .collect()
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// JWT 认证中间件 - 必须认证
/// 过期的 cookie 不会挡住有效的 Bearer 令牌
pub async fn jwt_auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tokens = extract_tokens(req.headers());

    match gate.authorize_any(&tokens) {
        AuthDecision::Allowed(identity) => {
            tracing::debug!(username = %identity.username, "Request authorized");
            req.extensions_mut().insert(AuthContext(identity));
            Ok(next.run(req).await)
        }
        AuthDecision::Denied(reason) => {
            metrics::counter!("auth_denials_total", "reason" => reason.as_str()).increment(1);
            tracing::debug!(
                reason = %reason,
                method = %req.method(),
                uri = %req.uri().path(),
                "Request denied by authorization gate"
            );
            Err(AppError::Unauthorized(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        assert_eq!(extract_tokens(&headers), vec!["test_token_123"]);
    }

    #[test]
    fn test_extract_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark; jwt=a.b.c; other=1".parse().unwrap());

        assert_eq!(extract_tokens(&headers), vec!["a.b.c"]);
    }

    #[test]
    fn test_cookie_ordered_before_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "jwt=from.cookie.token".parse().unwrap());
        headers.insert("authorization", "Bearer from.header.token".parse().unwrap());

        assert_eq!(
            extract_tokens(&headers),
            vec!["from.cookie.token", "from.header.token"]
        );
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(extract_tokens(&headers).is_empty());

        let mut headers = HeaderMap::new();
        headers.insert("cookie", "jwt=".parse().unwrap());
        headers.insert("authorization", "Bearer  ".parse().unwrap());
        assert!(extract_tokens(&headers).is_empty());
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());

        assert!(extract_tokens(&headers).is_empty());
    }
}
