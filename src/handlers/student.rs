//! 学生 CRUD 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    middleware::AppState,
    models::student::{parse_id, DeleteResponse, StudentRequest},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 列出所有学生
pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let students = state.students.list_students().await?;
    Ok(Json(students))
}

/// 获取单个学生
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    let student = state
        .students
        .find_student(id)
        .await?
        .ok_or_else(|| AppError::not_found("student"))?;

    Ok(Json(student))
}

/// 创建学生
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    AuthContext(identity): AuthContext,
    payload: Result<Json<StudentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let req = req.into_valid()?;

    let student = state.students.create_student(&req).await?;

    tracing::info!(
        stud_id = student.stud_id,
        actor = %identity.username,
        "Student created"
    );

    Ok(Json(student))
}

/// 更新学生
pub async fn update_student(
    State(state): State<Arc<AppState>>,
    AuthContext(identity): AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<StudentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    let req = req.into_valid()?;

    let student = state
        .students
        .update_student(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("student"))?;

    tracing::info!(stud_id = id, actor = %identity.username, "Student updated");

    Ok(Json(student))
}

/// 删除学生
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    AuthContext(identity): AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    let deleted = state.students.delete_student(id).await?;
    if deleted {
        tracing::info!(stud_id = id, actor = %identity.username, "Student deleted");
    }

    Ok(Json(DeleteResponse {
        deleted_id: deleted.then_some(id),
    }))
}
