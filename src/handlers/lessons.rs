// src/handlers/lessons.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::courses::{ensure_course_owner, ensure_enrolled},
    models::lesson::{CreateLessonRequest, Lesson},
    utils::{html::sanitize_rich_text, jwt::Claims},
};

const LESSON_COLUMNS: &str =
    "id, course_id, position, title, content, duration_minutes, created_at";

/// Lists a course's lessons in order.
/// Visible to enrolled students, the owning tutor and admins.
pub async fn list_lessons(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    if ensure_course_owner(&pool, course_id, &claims).await.is_err() {
        ensure_enrolled(&pool, course_id, claims.user_id()).await?;
    }

    let lessons = sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = ? ORDER BY position"
    ))
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(lessons))
}

/// Adds a lesson to a course. Owning tutor or admin only.
pub async fn create_lesson(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    ensure_course_owner(&pool, course_id, &claims).await?;

    let position = match payload.position {
        Some(position) if position >= 1 => position,
        _ => {
            let max: Option<i64> =
                sqlx::query_scalar("SELECT MAX(position) FROM lessons WHERE course_id = ?")
                    .bind(course_id)
                    .fetch_one(&pool)
                    .await?;
            max.unwrap_or(0) + 1
        }
    };

    let content = sanitize_rich_text(&payload.content);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lessons (course_id, position, title, content, duration_minutes, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(position)
    .bind(&payload.title)
    .bind(&content)
    .bind(payload.duration_minutes)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create lesson: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Marks a lesson complete for the calling student. Idempotent: completing
/// the same lesson twice keeps the original completion timestamp.
pub async fn complete_lesson(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course_id: Option<i64> = sqlx::query_scalar("SELECT course_id FROM lessons WHERE id = ?")
        .bind(lesson_id)
        .fetch_optional(&pool)
        .await?;

    let course_id = course_id.ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    ensure_enrolled(&pool, course_id, claims.user_id()).await?;

    sqlx::query(
        r#"
        INSERT INTO lesson_progress (lesson_id, user_id, completed_at)
        VALUES (?, ?, ?)
        ON CONFLICT (lesson_id, user_id) DO NOTHING
        "#,
    )
    .bind(lesson_id)
    .bind(claims.user_id())
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record lesson progress: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(serde_json::json!({ "message": "Lesson completed" })))
}
