// src/models/lesson.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'lessons' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    /// 1-based order within the course.
    pub position: i64,
    pub title: String,
    /// Sanitized HTML body.
    pub content: String,
    pub duration_minutes: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Outline entry shown on the course page (no body).
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: i64,
    pub position: i64,
    pub title: String,
    pub duration_minutes: Option<i64>,
}

/// DTO for adding a lesson to a course.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 50000))]
    pub content: String,
    /// Defaults to the end of the course when omitted.
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i64>,
}
