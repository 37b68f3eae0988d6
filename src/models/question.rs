// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::grading::QuestionKind;

/// Represents the 'questions' table in the database.
///
/// Deliberately not `Serialize`: rows carry the answer key, and everything
/// sent to clients goes through `PublicQuestion` instead.
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: i64,

    pub assessment_id: i64,

    /// 1-based order within the assessment.
    pub position: i64,

    /// Question type: 'multiple-choice', 'multiple-select' or 'true-false'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer for single-answer types.
    pub correct_answer: Option<String>,

    /// The correct answer set for 'multiple-select'.
    pub correct_answers: Option<Json<Vec<String>>>,
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Json<Vec<String>>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            position: q.position,
            question_type: q.question_type,
            content: q.content,
            options: q.options,
        }
    }
}

/// DTO for creating a question as part of an assessment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub correct_answers: Option<Vec<String>>,
}

impl CreateQuestionRequest {
    /// Type-dependent checks that field-level validators cannot express:
    /// the answer key must be present, and drawn from the options.
    pub fn check_answer_key(&self) -> Result<(), String> {
        match QuestionKind::parse(&self.question_type) {
            Some(QuestionKind::MultipleChoice) | Some(QuestionKind::TrueFalse) => {
                let answer = self
                    .correct_answer
                    .as_deref()
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        format!("Question '{}' is missing its correct answer", self.content)
                    })?;
                if !self.options.iter().any(|o| o == answer) {
                    return Err(format!(
                        "Correct answer '{}' is not one of the options",
                        answer
                    ));
                }
                Ok(())
            }
            Some(QuestionKind::MultipleSelect) => {
                let answers = self
                    .correct_answers
                    .as_deref()
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        format!("Question '{}' is missing its correct answers", self.content)
                    })?;
                for answer in answers {
                    if !self.options.iter().any(|o| o == answer) {
                        return Err(format!(
                            "Correct answer '{}' is not one of the options",
                            answer
                        ));
                    }
                }
                Ok(())
            }
            None => Err(format!("Unknown question type '{}'", self.question_type)),
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
