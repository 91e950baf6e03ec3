//! Student and grade repository

use crate::{
    db::{self, HealthStatus},
    error::AppError,
    models::student::{GradeRecord, Student, StudentRequest},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// 所有学生，按姓氏排序
    async fn list_students(&self) -> Result<Vec<Student>, AppError>;

    async fn find_student(&self, id: i32) -> Result<Option<Student>, AppError>;

    async fn create_student(&self, req: &StudentRequest) -> Result<Student, AppError>;

    async fn update_student(
        &self,
        id: i32,
        req: &StudentRequest,
    ) -> Result<Option<Student>, AppError>;

    /// 返回是否删除了记录
    async fn delete_student(&self, id: i32) -> Result<bool, AppError>;

    async fn list_grades(&self) -> Result<Vec<GradeRecord>, AppError>;

    async fn grades_for_student(&self, id: i32) -> Result<Vec<GradeRecord>, AppError>;

    /// 就绪检查
    async fn health(&self) -> HealthStatus;
}

const GRADE_SELECT: &str = r#"
    SELECT
        g.grade_id,
        s.stud_id,
        s.stud_fname,
        s.stud_sname,
        c.crs_name,
        g.stud_grade
    FROM grade g
    JOIN student s ON g.stud_id = s.stud_id
    JOIN course c ON g.crs_id = c.crs_id
"#;

pub struct StudentRepository {
    db: PgPool,
}

impl StudentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentStore for StudentRepository {
    async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT stud_id, stud_fname, stud_sname, stud_email FROM student ORDER BY stud_sname ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(students)
    }

    async fn find_student(&self, id: i32) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT stud_id, stud_fname, stud_sname, stud_email FROM student WHERE stud_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    async fn create_student(&self, req: &StudentRequest) -> Result<Student, AppError> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO student (stud_fname, stud_sname, stud_email)
            VALUES ($1, $2, $3)
            RETURNING stud_id, stud_fname, stud_sname, stud_email
            "#,
        )
        .bind(&req.stud_fname)
        .bind(&req.stud_sname)
        .bind(&req.stud_email)
        .fetch_one(&self.db)
        .await?;

        Ok(student)
    }

    async fn update_student(
        &self,
        id: i32,
        req: &StudentRequest,
    ) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE student
            SET stud_fname = $2, stud_sname = $3, stud_email = $4
            WHERE stud_id = $1
            RETURNING stud_id, stud_fname, stud_sname, stud_email
            "#,
        )
        .bind(id)
        .bind(&req.stud_fname)
        .bind(&req.stud_sname)
        .bind(&req.stud_email)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    async fn delete_student(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM student WHERE stud_id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_grades(&self) -> Result<Vec<GradeRecord>, AppError> {
        let grades = sqlx::query_as::<_, GradeRecord>(&format!("{} ORDER BY g.grade_id ASC", GRADE_SELECT))
            .fetch_all(&self.db)
            .await?;

        Ok(grades)
    }

    async fn grades_for_student(&self, id: i32) -> Result<Vec<GradeRecord>, AppError> {
        let grades = sqlx::query_as::<_, GradeRecord>(&format!(
            "{} WHERE s.stud_id = $1 ORDER BY g.grade_id ASC",
            GRADE_SELECT
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(grades)
    }

    async fn health(&self) -> HealthStatus {
        db::health_check(&self.db).await
    }
}

// ==================== 内存实现 ====================

#[derive(Default)]
struct InMemoryData {
    next_student_id: i32,
    next_grade_id: i32,
    students: BTreeMap<i32, Student>,
    courses: BTreeMap<i32, String>,
    // grade_id -> (stud_id, crs_id, grade)
    grades: BTreeMap<i32, (i32, i32, i32)>,
}

impl InMemoryData {
    fn grade_records(&self, filter: Option<i32>) -> Vec<GradeRecord> {
        self.grades
            .iter()
            .filter(|(_, (stud_id, _, _))| filter.map_or(true, |id| id == *stud_id))
            .filter_map(|(grade_id, (stud_id, crs_id, grade))| {
                let student = self.students.get(stud_id)?;
                let course = self.courses.get(crs_id)?;
                Some(GradeRecord {
                    grade_id: *grade_id,
                    stud_id: *stud_id,
                    stud_fname: student.stud_fname.clone(),
                    stud_sname: student.stud_sname.clone(),
                    crs_name: course.clone(),
                    stud_grade: *grade,
                })
            })
            .collect()
    }
}

/// 内存学生存储（测试与本地开发）
#[derive(Default)]
pub struct InMemoryStudentStore {
    data: RwLock<InMemoryData>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_course(&self, crs_id: i32, name: &str) {
        self.data.write().await.courses.insert(crs_id, name.to_string());
    }

    pub async fn add_grade(&self, stud_id: i32, crs_id: i32, grade: i32) -> i32 {
        let mut data = self.data.write().await;
        data.next_grade_id += 1;
        let grade_id = data.next_grade_id;
        data.grades.insert(grade_id, (stud_id, crs_id, grade));
        grade_id
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let mut students: Vec<Student> = self.data.read().await.students.values().cloned().collect();
        students.sort_by(|a, b| a.stud_sname.cmp(&b.stud_sname));
        Ok(students)
    }

    async fn find_student(&self, id: i32) -> Result<Option<Student>, AppError> {
        Ok(self.data.read().await.students.get(&id).cloned())
    }

    async fn create_student(&self, req: &StudentRequest) -> Result<Student, AppError> {
        let mut data = self.data.write().await;
        data.next_student_id += 1;
        let student = Student {
            stud_id: data.next_student_id,
            stud_fname: req.stud_fname.clone(),
            stud_sname: req.stud_sname.clone(),
            stud_email: req.stud_email.clone(),
        };
        data.students.insert(student.stud_id, student.clone());
        Ok(student)
    }

    async fn update_student(
        &self,
        id: i32,
        req: &StudentRequest,
    ) -> Result<Option<Student>, AppError> {
        let mut data = self.data.write().await;
        Ok(data.students.get_mut(&id).map(|student| {
            student.stud_fname = req.stud_fname.clone();
            student.stud_sname = req.stud_sname.clone();
            student.stud_email = req.stud_email.clone();
            student.clone()
        }))
    }

    async fn delete_student(&self, id: i32) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let removed = data.students.remove(&id).is_some();
        if removed {
            data.grades.retain(|_, (stud_id, _, _)| *stud_id != id);
        }
        Ok(removed)
    }

    async fn list_grades(&self) -> Result<Vec<GradeRecord>, AppError> {
        Ok(self.data.read().await.grade_records(None))
    }

    async fn grades_for_student(&self, id: i32) -> Result<Vec<GradeRecord>, AppError> {
        Ok(self.data.read().await.grade_records(Some(id)))
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
