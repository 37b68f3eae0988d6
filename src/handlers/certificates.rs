// src/handlers/certificates.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{Months, Utc};
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    config::{CERTIFICATE_ISSUER, CERTIFICATE_VALIDITY_MONTHS},
    error::AppError,
    grading,
    models::{assessment::Assessment, certificate::{Certificate, VerifyResponse}, course::Course},
    utils::{credential::generate_credential_id, jwt::Claims},
};

const CERTIFICATE_COLUMNS: &str = "id, credential_id, title, user_id, course_id, assessment_id, \
     issuer, grade, score, skills, status, issued_at, expires_at";

async fn find_certificate(
    pool: &SqlitePool,
    user_id: i64,
    course_id: i64,
    assessment_id: i64,
) -> Result<Option<Certificate>, AppError> {
    Ok(sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {CERTIFICATE_COLUMNS} FROM certificates \
         WHERE user_id = ? AND course_id = ? AND assessment_id = ?"
    ))
    .bind(user_id)
    .bind(course_id)
    .bind(assessment_id)
    .fetch_optional(pool)
    .await?)
}

/// Issues (or reuses) the certificate for a passing submission.
///
/// Idempotent: the UNIQUE index on (user, course, assessment) plus the
/// ON CONFLICT insert means retries and concurrent passing submissions
/// converge on a single certificate row.
pub async fn issue_for_assessment(
    pool: &SqlitePool,
    user_id: i64,
    assessment: &Assessment,
    score: i64,
) -> Result<Certificate, AppError> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT id, title, description, category, tags, status, tutor_id, created_at \
         FROM courses WHERE id = ?",
    )
    .bind(assessment.course_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "Course {} not found for certificate issuance",
            assessment.course_id
        ))
    })?;

    if let Some(existing) = find_certificate(pool, user_id, course.id, assessment.id).await? {
        return Ok(existing);
    }

    let issued_at = Utc::now();
    let expires_at = issued_at + Months::new(CERTIFICATE_VALIDITY_MONTHS);
    let grade = grading::letter_grade(score);
    let credential_id = generate_credential_id(&course.title, issued_at);
    let title = format!("{} Certificate", course.title);

    sqlx::query(
        r#"
        INSERT INTO certificates
        (credential_id, title, user_id, course_id, assessment_id, issuer, grade, score,
         skills, status, issued_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'issued', ?, ?)
        ON CONFLICT (user_id, course_id, assessment_id) DO NOTHING
        "#,
    )
    .bind(&credential_id)
    .bind(&title)
    .bind(user_id)
    .bind(course.id)
    .bind(assessment.id)
    .bind(CERTIFICATE_ISSUER)
    .bind(grade)
    .bind(score)
    .bind(SqlJson(course.tags.0.clone()))
    .bind(issued_at)
    .bind(expires_at)
    .execute(pool)
    .await?;

    // Re-read rather than RETURNING: on conflict the insert is a no-op and
    // the row that won the race is the certificate to hand back.
    find_certificate(pool, user_id, course.id, assessment.id)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError("Certificate row missing after insert".to_string())
        })
}

/// Lists the caller's certificates, newest first.
pub async fn list_my_certificates(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let certificates = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = ? ORDER BY id DESC"
    ))
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(certificates))
}

/// Manual re-trigger of issuance for an assessment the caller already
/// passed. Useful when the best-effort issuance after grading failed.
pub async fn generate_from_assessment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let assessment = sqlx::query_as::<_, Assessment>(
        "SELECT id, course_id, title, description, kind, category, time_limit_minutes, \
         due_date, status, passing_score, created_by, created_at \
         FROM assessments WHERE id = ?",
    )
    .bind(assessment_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    // Best passing attempt decides the certificate grade.
    let best: Option<(i64, i64)> = sqlx::query_as(
        "SELECT id, score FROM submissions \
         WHERE assessment_id = ? AND user_id = ? AND passed = 1 \
         ORDER BY score DESC, id DESC LIMIT 1",
    )
    .bind(assessment_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    let (submission_id, score) = best.ok_or(AppError::NotFound(
        "No passing submission for this assessment".to_string(),
    ))?;

    let certificate = issue_for_assessment(&pool, user_id, &assessment, score).await?;

    sqlx::query(
        "UPDATE submissions SET certificate_id = ? WHERE id = ? AND certificate_id IS NULL",
    )
    .bind(certificate.id)
    .bind(submission_id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Certificate ready",
        "certificate": certificate
    })))
}

/// Public verification of a credential id.
/// Reports revocation and expiry; never requires authentication.
pub async fn verify_certificate(
    State(pool): State<SqlitePool>,
    Path(credential_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE credential_id = ?"
    ))
    .bind(&credential_id)
    .fetch_optional(&pool)
    .await?;

    let Some(certificate) = certificate else {
        return Ok(Json(VerifyResponse {
            valid: false,
            certificate: None,
            message: "Certificate not found".to_string(),
        }));
    };

    if certificate.status == "revoked" {
        return Ok(Json(VerifyResponse {
            valid: false,
            certificate: Some(certificate),
            message: "Certificate has been revoked".to_string(),
        }));
    }

    if let Some(expires_at) = certificate.expires_at {
        if expires_at < Utc::now() {
            return Ok(Json(VerifyResponse {
                valid: false,
                certificate: Some(certificate),
                message: "Certificate has expired".to_string(),
            }));
        }
    }

    Ok(Json(VerifyResponse {
        valid: true,
        certificate: Some(certificate),
        message: "Certificate is valid".to_string(),
    }))
}
