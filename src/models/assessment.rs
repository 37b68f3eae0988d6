// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion};

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: i64,

    pub course_id: i64,

    pub title: String,

    pub description: Option<String>,

    /// 'quiz', 'exam' or 'assignment'.
    #[serde(rename = "type")]
    pub kind: String,

    pub category: Option<String>,

    pub time_limit_minutes: Option<i64>,

    pub due_date: Option<chrono::DateTime<chrono::Utc>>,

    /// 'draft' or 'published'. Draft assessments do not accept submissions.
    pub status: String,

    /// Percentage threshold at or above which a submission passes.
    pub passing_score: i64,

    pub created_by: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Assessment with its questions, answer key stripped.
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating an assessment together with its questions.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessmentRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// 'quiz', 'exam' or 'assignment'; checked in the handler.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i64>,
    #[serde(default)]
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    /// 'draft' or 'published'; checked in the handler.
    #[serde(default = "default_status")]
    pub status: String,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i64,
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_kind() -> String {
    "quiz".to_string()
}

fn default_status() -> String {
    "draft".to_string()
}
