// src/handlers/assessments.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use sqlx::{SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    grading,
    handlers::{certificates, courses::ensure_course_owner},
    models::{
        assessment::{Assessment, AssessmentDetail, CreateAssessmentRequest},
        question::{PublicQuestion, Question},
        submission::{
            SubmitAssessmentRequest, SubmitResponse, Submission, SubmissionAnswer,
            SubmissionWithAnswers,
        },
    },
    utils::jwt::Claims,
};

const ASSESSMENT_COLUMNS: &str = "id, course_id, title, description, kind, category, \
     time_limit_minutes, due_date, status, passing_score, created_by, created_at";

const QUESTION_COLUMNS: &str =
    "id, assessment_id, position, type, content, options, correct_answer, correct_answers";

const SUBMISSION_COLUMNS: &str = "id, assessment_id, user_id, score, passed, \
     time_spent_seconds, started_at, completed_at, certificate_id, created_at";

async fn fetch_assessment(pool: &SqlitePool, id: i64) -> Result<Assessment, AppError> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Assessment not found".to_string()))
}

async fn fetch_questions(pool: &SqlitePool, assessment_id: i64) -> Result<Vec<Question>, AppError> {
    Ok(sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE assessment_id = ? ORDER BY position"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await?)
}

/// Creates an assessment together with its questions. Tutor only.
pub async fn create_assessment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !matches!(payload.kind.as_str(), "quiz" | "exam" | "assignment") {
        return Err(AppError::BadRequest(format!(
            "Invalid assessment type '{}'",
            payload.kind
        )));
    }

    if !matches!(payload.status.as_str(), "draft" | "published") {
        return Err(AppError::BadRequest(format!(
            "Invalid assessment status '{}'",
            payload.status
        )));
    }

    for question in &payload.questions {
        question.check_answer_key().map_err(AppError::BadRequest)?;
    }

    ensure_course_owner(&pool, payload.course_id, &claims).await?;

    let mut tx = pool.begin().await?;

    let assessment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO assessments
        (course_id, title, description, kind, category, time_limit_minutes, due_date,
         status, passing_score, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.kind)
    .bind(&payload.category)
    .bind(payload.time_limit_minutes)
    .bind(payload.due_date)
    .bind(&payload.status)
    .bind(payload.passing_score)
    .bind(claims.user_id())
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for (index, question) in payload.questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions
            (assessment_id, position, type, content, options, correct_answer, correct_answers)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(assessment_id)
        .bind(index as i64 + 1)
        .bind(&question.question_type)
        .bind(&question.content)
        .bind(SqlJson(question.options.clone()))
        .bind(&question.correct_answer)
        .bind(question.correct_answers.clone().map(SqlJson))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": assessment_id })),
    ))
}

/// Fetches an assessment with its questions, answer key stripped.
pub async fn get_assessment(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = fetch_assessment(&pool, id).await?;
    let questions = fetch_questions(&pool, id).await?;

    Ok(Json(AssessmentDetail {
        assessment,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

/// Submits an attempt: normalizes the answers, grades every question,
/// persists the submission, and (best-effort) issues a certificate on a
/// passing score.
pub async fn submit_assessment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let assessment = fetch_assessment(&pool, id).await?;
    if assessment.status != "published" {
        return Err(AppError::BadRequest(
            "Assessment is not published".to_string(),
        ));
    }

    let questions = fetch_questions(&pool, id).await?;

    let submitted = grading::normalize_answers(req.answers.as_ref());
    let graded = grading::grade(&questions, &submitted);
    let correct_count = graded.iter().filter(|g| g.is_correct).count();
    let score = grading::score_percentage(correct_count, questions.len());
    let passed = score >= assessment.passing_score;

    let time_spent = req.time_spent.unwrap_or(0).max(0);
    let completed_at = Utc::now();
    let started_at = completed_at - Duration::seconds(time_spent);

    let mut tx = pool.begin().await?;

    let submission_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO submissions
        (assessment_id, user_id, score, passed, time_spent_seconds, started_at, completed_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(score)
    .bind(passed)
    .bind(time_spent)
    .bind(started_at)
    .bind(completed_at)
    .bind(completed_at)
    .fetch_one(&mut *tx)
    .await?;

    for answer in &graded {
        sqlx::query(
            r#"
            INSERT INTO submission_answers
            (submission_id, question_id, selected_answer, selected_answers, is_correct)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(submission_id)
        .bind(answer.question_id)
        .bind(answer.selected_answer.as_deref())
        .bind(SqlJson(answer.selected_answers.clone()))
        .bind(answer.is_correct)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    // The submission above is durable; certificate issuance is strictly
    // best-effort and must never fail the request.
    let certificate = if passed {
        match certificates::issue_for_assessment(&pool, user_id, &assessment, score).await {
            Ok(certificate) => {
                if let Err(e) = sqlx::query("UPDATE submissions SET certificate_id = ? WHERE id = ?")
                    .bind(certificate.id)
                    .bind(submission_id)
                    .execute(&pool)
                    .await
                {
                    tracing::warn!(
                        "Failed to link certificate {} to submission {}: {:?}",
                        certificate.id,
                        submission_id,
                        e
                    );
                }
                Some(certificate)
            }
            Err(e) => {
                tracing::error!(
                    "Certificate issuance failed for assessment {} user {}: {:?}",
                    id,
                    user_id,
                    e
                );
                None
            }
        }
    } else {
        None
    };

    let message = if passed {
        "Assessment passed".to_string()
    } else {
        "Assessment submitted".to_string()
    };

    Ok(Json(SubmitResponse {
        message,
        score,
        total_questions: questions.len(),
        correct_answers: correct_count,
        incorrect_answers: questions.len() - correct_count,
        passed,
        certificate,
    }))
}

/// Returns the caller's most recent submission for an assessment,
/// including the graded answers. 404 when the caller has not submitted.
pub async fn get_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_assessment(&pool, id).await?;

    let submission = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions \
         WHERE assessment_id = ? AND user_id = ? ORDER BY id DESC LIMIT 1"
    ))
    .bind(id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "No submission found for this assessment".to_string(),
    ))?;

    let answers = sqlx::query_as::<_, SubmissionAnswer>(
        "SELECT id, submission_id, question_id, selected_answer, selected_answers, is_correct \
         FROM submission_answers WHERE submission_id = ? ORDER BY id",
    )
    .bind(submission.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "result": SubmissionWithAnswers { submission, answers }
    })))
}

/// Lists every submission for an assessment. Creator tutor or admin only.
pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = fetch_assessment(&pool, id).await?;

    if assessment.created_by != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You did not create this assessment".to_string(),
        ));
    }

    let submissions = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE assessment_id = ? ORDER BY id DESC"
    ))
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(submissions))
}
