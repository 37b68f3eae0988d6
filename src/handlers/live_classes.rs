// src/handlers/live_classes.rs

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
    handlers::courses::ensure_course_owner,
    models::live_class::{CreateLiveClassRequest, LiveClass, UpdateLiveClassStatusRequest},
    utils::jwt::Claims,
};

const LIVE_CLASS_COLUMNS: &str = "id, course_id, tutor_id, title, description, scheduled_at, \
     duration_minutes, meeting_url, status, created_at";

/// Schedules a live class for a course. Owning tutor or admin only.
pub async fn create_live_class(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateLiveClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    ensure_course_owner(&pool, payload.course_id, &claims).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO live_classes
        (course_id, tutor_id, title, description, scheduled_at, duration_minutes,
         meeting_url, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'scheduled', ?)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.scheduled_at)
    .bind(payload.duration_minutes)
    .bind(&payload.meeting_url)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to schedule live class: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists a course's live classes, soonest first.
pub async fn list_for_course(
    State(pool): State<SqlitePool>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let sessions = sqlx::query_as::<_, LiveClass>(&format!(
        "SELECT {LIVE_CLASS_COLUMNS} FROM live_classes WHERE course_id = ? ORDER BY scheduled_at"
    ))
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sessions))
}

/// Moves a session along scheduled -> live -> ended, or cancels a session
/// that has not ended. Owning tutor or admin only.
pub async fn update_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLiveClassStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = sqlx::query_as::<_, LiveClass>(&format!(
        "SELECT {LIVE_CLASS_COLUMNS} FROM live_classes WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Live class not found".to_string()))?;

    if session.tutor_id != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You do not manage this live class".to_string(),
        ));
    }

    let allowed = matches!(
        (session.status.as_str(), payload.status.as_str()),
        ("scheduled", "live") | ("live", "ended") | ("scheduled", "cancelled") | ("live", "cancelled")
    );
    if !allowed {
        return Err(AppError::BadRequest(format!(
            "Cannot move live class from '{}' to '{}'",
            session.status, payload.status
        )));
    }

    sqlx::query("UPDATE live_classes SET status = ? WHERE id = ?")
        .bind(&payload.status)
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Status updated",
        "status": payload.status
    })))
}
