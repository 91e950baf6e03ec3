//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{handlers, middleware::AppState};

/// 请求体上限
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由
    let auth_routes = Router::new()
        .route("/auth", post(handlers::auth::login))
        .route("/login-root", post(handlers::auth::register))
        .route("/logout", get(handlers::auth::logout));

    // 只读查询无需令牌
    let read_routes = Router::new()
        .route("/student", get(handlers::student::list_students))
        .route("/student/{id}", get(handlers::student::get_student))
        .route("/grade", get(handlers::grade::list_grades))
        .route("/grade/{id}", get(handlers::grade::grades_for_student));

    // 修改操作必须通过授权门
    let gated_routes = Router::new()
        .route("/student", post(handlers::student::create_student))
        .route(
            "/student/{id}",
            put(handlers::student::update_student)
                .delete(handlers::student::delete_student),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(read_routes)
        .merge(gated_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
