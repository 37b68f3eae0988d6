// src/models/certificate.rs

use serde::Serialize;
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'certificates' table in the database.
/// At most one row per (user, course, assessment), enforced by a UNIQUE index.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,

    /// Human-readable, globally unique credential id used for verification.
    pub credential_id: String,

    pub title: String,

    pub user_id: i64,
    pub course_id: i64,
    pub assessment_id: i64,

    pub issuer: String,

    /// Letter grade A-F derived from the submission score.
    pub grade: String,

    pub score: i64,

    /// Skill tags copied from the course at issue time.
    pub skills: Json<Vec<String>>,

    /// 'issued' or 'revoked'.
    pub status: String,

    pub issued_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Response body for the public verification endpoint.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    pub message: String,
}
