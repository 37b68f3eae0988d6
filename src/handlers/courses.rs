// src/handlers/courses.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseDetail, CourseProgress, CreateCourseRequest, UpdateCourseRequest},
        lesson::LessonSummary,
    },
    utils::{html::sanitize_rich_text, jwt::Claims},
};

const COURSE_COLUMNS: &str = "id, title, description, category, tags, status, tutor_id, created_at";

#[derive(Debug, Deserialize)]
pub struct CourseFilter {
    pub category: Option<String>,
}

/// Lists published courses for the catalog. Public.
pub async fn list_courses(
    State(pool): State<SqlitePool>,
    Query(filter): Query<CourseFilter>,
) -> Result<impl IntoResponse, AppError> {
    let courses = match filter.category {
        Some(category) => {
            sqlx::query_as::<_, Course>(&format!(
                "SELECT {COURSE_COLUMNS} FROM courses WHERE status = 'published' AND category = ? ORDER BY id DESC"
            ))
            .bind(category)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Course>(&format!(
                "SELECT {COURSE_COLUMNS} FROM courses WHERE status = 'published' ORDER BY id DESC"
            ))
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(courses))
}

/// Fetches one course with its lesson outline. Public.
pub async fn get_course(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let lessons = sqlx::query_as::<_, LessonSummary>(
        "SELECT id, position, title, duration_minutes FROM lessons WHERE course_id = ? ORDER BY position",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(CourseDetail { course, lessons }))
}

/// Creates a new course owned by the calling tutor.
pub async fn create_course(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let description = sanitize_rich_text(&payload.description);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO courses (title, description, category, tags, status, tutor_id, created_at)
        VALUES (?, ?, ?, ?, 'draft', ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.category)
    .bind(SqlJson(payload.tags))
    .bind(claims.user_id())
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates a course by ID. Owning tutor or admin only.
pub async fn update_course(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(status) = payload.status.as_deref() {
        if status != "draft" && status != "published" {
            return Err(AppError::BadRequest(format!(
                "Invalid course status '{}'",
                status
            )));
        }
    }

    ensure_course_owner(&pool, id, &claims).await?;

    if payload.title.is_none()
        && payload.description.is_none()
        && payload.category.is_none()
        && payload.tags.is_none()
        && payload.status.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE courses SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(sanitize_rich_text(&description));
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    if let Some(tags) = payload.tags {
        separated.push("tags = ");
        separated.push_bind_unseparated(SqlJson(tags));
    }

    if let Some(status) = payload.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

/// Enrolls the calling student into a published course.
pub async fn enroll(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let status = status.ok_or(AppError::NotFound("Course not found".to_string()))?;
    if status != "published" {
        return Err(AppError::BadRequest(
            "Course is not open for enrollment".to_string(),
        ));
    }

    sqlx::query("INSERT INTO enrollments (course_id, user_id, enrolled_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(claims.user_id())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::Conflict("Already enrolled in this course".to_string())
            } else {
                tracing::error!("Failed to enroll: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Enrolled successfully" })),
    ))
}

/// Returns the caller's lesson completion summary for a course.
pub async fn get_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_enrolled(&pool, id, claims.user_id()).await?;

    let total_lessons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await?;

    let completed_lessons: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM lesson_progress p
        JOIN lessons l ON p.lesson_id = l.id
        WHERE l.course_id = ? AND p.user_id = ?
        "#,
    )
    .bind(id)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    let percent_complete = if total_lessons == 0 {
        0
    } else {
        ((completed_lessons as f64 / total_lessons as f64) * 100.0).round() as i64
    };

    Ok(Json(CourseProgress {
        course_id: id,
        total_lessons,
        completed_lessons,
        percent_complete,
    }))
}

/// Loads a course and checks the caller may manage it (owning tutor or admin).
pub async fn ensure_course_owner(
    pool: &SqlitePool,
    course_id: i64,
    claims: &Claims,
) -> Result<(), AppError> {
    let tutor_id: Option<i64> = sqlx::query_scalar("SELECT tutor_id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    let tutor_id = tutor_id.ok_or(AppError::NotFound("Course not found".to_string()))?;

    if tutor_id != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You do not manage this course".to_string(),
        ));
    }

    Ok(())
}

/// Checks the user is enrolled in the course.
pub async fn ensure_enrolled(
    pool: &SqlitePool,
    course_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    let enrolled: Option<i64> =
        sqlx::query_scalar("SELECT id FROM enrollments WHERE course_id = ? AND user_id = ?")
            .bind(course_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    if enrolled.is_none() {
        return Err(AppError::Forbidden(
            "You are not enrolled in this course".to_string(),
        ));
    }

    Ok(())
}
