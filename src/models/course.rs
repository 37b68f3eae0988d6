// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::lesson::LessonSummary;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,

    pub title: String,

    /// Sanitized HTML description.
    pub description: String,

    /// Catalog category (e.g., "Programming", "Mathematics").
    pub category: String,

    /// Skill tags; copied onto certificates issued for this course.
    /// Stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    /// 'draft' or 'published'. Only published courses appear in the catalog.
    pub status: String,

    pub tutor_id: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Course detail with its lesson outline.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<LessonSummary>,
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
}

/// DTO for updating a course. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,
    /// 'draft' or 'published'; checked in the handler.
    pub status: Option<String>,
}

/// A student's completion summary for one course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: i64,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percent_complete: i64,
}

fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    for tag in tags {
        if tag.is_empty() || tag.len() > 50 {
            return Err(validator::ValidationError::new("tag_length"));
        }
    }
    Ok(())
}
