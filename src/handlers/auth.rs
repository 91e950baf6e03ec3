//! 认证相关的 HTTP 处理器

use crate::{
    auth::{extract_tokens, TOKEN_COOKIE},
    error::AppError,
    middleware::AppState,
    models::{
        auth::{LoginRequest, LoginResponse, MessageResponse},
        user::RegisterRequest,
    },
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 登录：成功后写入 jwt cookie 并在响应体中返回令牌
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let outcome = state.auth_service.login(req).await?;
    let cookie = session_cookie(
        &outcome.issued.token,
        state.config.security.token_ttl_secs,
        state.config.security.cookie_secure,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: outcome.username,
            token: outcome.issued.token,
        }),
    ))
}

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let created = state.auth_service.register(req).await?;

    Ok(Json(created))
}

/// 登出：清除 cookie
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    state.auth_service.logout(&extract_tokens(&headers));

    (
        [(header::SET_COOKIE, expired_cookie(state.config.security.cookie_secure))],
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn expired_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
