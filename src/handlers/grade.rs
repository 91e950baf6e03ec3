//! 成绩查询处理器

use crate::{error::AppError, middleware::AppState, models::student::parse_id};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 所有成绩记录
pub async fn list_grades(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let grades = state.students.list_grades().await?;
    Ok(Json(grades))
}

/// 某个学生的成绩；学生不存在时返回空列表
pub async fn grades_for_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let grades = state.students.grades_for_student(id).await?;
    Ok(Json(grades))
}
