// src/models/submission.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};

use crate::models::certificate::Certificate;

/// Represents the 'submissions' table in the database.
/// One row per submit call; never mutated afterward (only the certificate
/// back-reference is filled in once issuance succeeds).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub assessment_id: i64,
    pub user_id: i64,
    /// 0-100, rounded half-up.
    pub score: i64,
    pub passed: bool,
    pub time_spent_seconds: i64,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub certificate_id: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'submission_answers' table: one graded answer per
/// assessment question, including skipped ones.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAnswer {
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    /// Filled for single-answer question types.
    pub selected_answer: Option<String>,
    /// Filled for 'multiple-select'; empty list otherwise.
    pub selected_answers: Json<Vec<String>>,
    pub is_correct: bool,
}

/// A submission together with its graded answers, as returned by the
/// results endpoint.
#[derive(Debug, Serialize)]
pub struct SubmissionWithAnswers {
    #[serde(flatten)]
    pub submission: Submission,
    pub answers: Vec<SubmissionAnswer>,
}

/// DTO for submitting an assessment attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessmentRequest {
    #[serde(default)]
    pub answers: Option<AnswerPayload>,
    /// Seconds the client reports the attempt took.
    #[serde(default)]
    pub time_spent: Option<i64>,
}

/// The `answers` field as clients actually send it: a list of answer
/// objects, a map keyed by question id, or something malformed (which
/// degrades to "nothing answered" rather than failing the request).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    List(Vec<RawAnswer>),
    Map(HashMap<String, Value>),
    Other(Value),
}

/// One entry of the list-shaped payload. Every field is lenient; entries
/// without a usable question id are dropped during normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnswer {
    #[serde(default)]
    pub question_id: Option<Value>,
    #[serde(default)]
    pub selected_answer: Option<Value>,
    #[serde(default)]
    pub selected_answers: Option<Value>,
}

/// Response body for the submit endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub score: i64,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    pub passed: bool,
    /// Present when the attempt passed and issuance (or reuse) succeeded.
    pub certificate: Option<Certificate>,
}
