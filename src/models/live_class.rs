// src/models/live_class.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'live_classes' table: session bookkeeping for scheduled
/// online classes. The realtime transport itself lives elsewhere.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveClass {
    pub id: i64,
    pub course_id: i64,
    pub tutor_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: i64,
    pub meeting_url: Option<String>,
    /// 'scheduled', 'live', 'ended' or 'cancelled'.
    pub status: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for scheduling a live class.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLiveClassRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i64,
    #[serde(default)]
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub meeting_url: Option<String>,
}

/// DTO for moving a session along its lifecycle.
#[derive(Debug, Deserialize)]
pub struct UpdateLiveClassStatusRequest {
    pub status: String,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
