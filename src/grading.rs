// src/grading.rs

//! Assessment grading: answer normalization, per-question correctness,
//! aggregate scoring and letter grades.
//!
//! Everything here is pure and synchronous; the submit handler owns all
//! persistence. Grading the same assessment and answers twice always
//! produces the same result.

use serde_json::Value;

use crate::models::question::Question;
use crate::models::submission::{AnswerPayload, RawAnswer};

/// Closed set of question types the grader understands.
/// Anything else fails closed: graded, but never correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    MultipleSelect,
}

impl QuestionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple-choice" => Some(Self::MultipleChoice),
            "true-false" => Some(Self::TrueFalse),
            "multiple-select" => Some(Self::MultipleSelect),
            _ => None,
        }
    }
}

/// One submitted answer after normalization: every selected value,
/// string-coerced, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selections: Vec<String>,
}

/// One graded answer, in the shape it is persisted: single-answer types
/// fill `selected_answer`, 'multiple-select' fills `selected_answers`.
#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_answer: Option<String>,
    pub selected_answers: Vec<String>,
    pub is_correct: bool,
}

/// Reshapes whatever the client sent into one record per answered question.
///
/// Tolerates a list of answer objects or a map keyed by question id; any
/// other shape, unparseable question ids and empty selections all degrade
/// to "this question was not answered". Normalization never fails the
/// request, and nothing past this point deals with payload shapes.
pub fn normalize_answers(payload: Option<&AnswerPayload>) -> Vec<SubmittedAnswer> {
    match payload {
        Some(AnswerPayload::List(entries)) => {
            entries.iter().filter_map(normalize_entry).collect()
        }
        Some(AnswerPayload::Map(map)) => map
            .iter()
            .filter_map(|(key, value)| {
                let question_id = key.trim().parse::<i64>().ok()?;
                Some(SubmittedAnswer {
                    question_id,
                    selections: coerce_selections(value),
                })
            })
            .collect(),
        Some(AnswerPayload::Other(_)) | None => Vec::new(),
    }
}

fn normalize_entry(entry: &RawAnswer) -> Option<SubmittedAnswer> {
    let question_id = entry.question_id.as_ref().and_then(value_as_id)?;

    // `selectedAnswers` wins when populated; a bare list (or scalar) in
    // `selectedAnswer` is tolerated as a fallback.
    let mut selections = entry
        .selected_answers
        .as_ref()
        .map(coerce_selections)
        .unwrap_or_default();
    if selections.is_empty() {
        if let Some(single) = entry.selected_answer.as_ref() {
            selections = coerce_selections(single);
        }
    }

    Some(SubmittedAnswer {
        question_id,
        selections,
    })
}

fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Flattens a selected value into string form: lists flatten, maps
/// contribute their values, empty strings and nulls drop out.
fn coerce_selections(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items.iter().flat_map(coerce_selections).collect(),
        Value::Object(map) => map.values().flat_map(coerce_selections).collect(),
    }
}

/// Grades every question of an assessment against the normalized answers.
///
/// The assessment's question list is authoritative: the output covers each
/// question in order, and questions without a usable submission grade as
/// skipped rather than erroring.
pub fn grade(questions: &[Question], answers: &[SubmittedAnswer]) -> Vec<GradedAnswer> {
    questions
        .iter()
        .map(|question| {
            let submitted = answers.iter().find(|a| a.question_id == question.id);
            grade_question(question, submitted)
        })
        .collect()
}

fn grade_question(question: &Question, submitted: Option<&SubmittedAnswer>) -> GradedAnswer {
    let selections: &[String] = submitted
        .map(|s| s.selections.as_slice())
        .unwrap_or_default();

    if selections.is_empty() {
        // Skipped (absent, empty string, empty list).
        return GradedAnswer {
            question_id: question.id,
            selected_answer: None,
            selected_answers: Vec::new(),
            is_correct: false,
        };
    }

    match QuestionKind::parse(&question.question_type) {
        Some(QuestionKind::MultipleSelect) => {
            let correct: &[String] = question
                .correct_answers
                .as_ref()
                .map(|c| c.0.as_slice())
                .unwrap_or_default();
            GradedAnswer {
                question_id: question.id,
                selected_answer: None,
                selected_answers: selections.to_vec(),
                is_correct: sets_match(correct, selections),
            }
        }
        Some(QuestionKind::MultipleChoice) | Some(QuestionKind::TrueFalse) => {
            let chosen = selections.first().cloned();
            let is_correct = match (chosen.as_deref(), question.correct_answer.as_deref()) {
                (Some(selected), Some(correct)) => selected == correct,
                _ => false,
            };
            GradedAnswer {
                question_id: question.id,
                selected_answer: chosen,
                selected_answers: Vec::new(),
                is_correct,
            }
        }
        None => GradedAnswer {
            question_id: question.id,
            selected_answer: selections.first().cloned(),
            selected_answers: Vec::new(),
            is_correct: false,
        },
    }
}

/// Order-independent comparison without de-duplication: lengths must match
/// and every element of each list must appear in the other. Duplicate
/// submitted values therefore fail the length check against a
/// duplicate-free answer key.
fn sets_match(correct: &[String], selected: &[String]) -> bool {
    correct.len() == selected.len()
        && correct.iter().all(|c| selected.contains(c))
        && selected.iter().all(|s| correct.contains(s))
}

/// Percentage score, rounded half-up. An assessment with no questions
/// scores 0.
pub fn score_percentage(correct_count: usize, total_questions: usize) -> i64 {
    if total_questions == 0 {
        return 0;
    }
    ((correct_count as f64 / total_questions as f64) * 100.0).round() as i64
}

/// Letter grade for a passing score, thresholded at 90/80/70/60.
pub fn letter_grade(score: i64) -> &'static str {
    match score {
        s if s >= 90 => "A",
        s if s >= 80 => "B",
        s if s >= 70 => "C",
        s if s >= 60 => "D",
        _ => "F",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    fn single_choice(id: i64, correct: &str) -> Question {
        Question {
            id,
            assessment_id: 1,
            position: id,
            question_type: "multiple-choice".to_string(),
            content: format!("Question {}", id),
            options: Json(vec![
                "Paris".to_string(),
                "London".to_string(),
                "Berlin".to_string(),
            ]),
            correct_answer: Some(correct.to_string()),
            correct_answers: None,
        }
    }

    fn multi_select(id: i64, correct: &[&str]) -> Question {
        Question {
            id,
            assessment_id: 1,
            position: id,
            question_type: "multiple-select".to_string(),
            content: format!("Question {}", id),
            options: Json(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
            correct_answer: None,
            correct_answers: Some(Json(correct.iter().map(|s| s.to_string()).collect())),
        }
    }

    fn answer(question_id: i64, selections: &[&str]) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selections: selections.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_choice_exact_match() {
        let questions = vec![single_choice(1, "Paris")];
        let graded = grade(&questions, &[answer(1, &["Paris"])]);
        assert!(graded[0].is_correct);
        assert_eq!(graded[0].selected_answer.as_deref(), Some("Paris"));
        assert!(graded[0].selected_answers.is_empty());
    }

    #[test]
    fn test_single_choice_array_form_uses_first_element() {
        let payload: AnswerPayload = serde_json::from_value(json!([
            {"questionId": 1, "selectedAnswer": ["Paris", "London"]}
        ]))
        .unwrap();
        let normalized = normalize_answers(Some(&payload));
        let graded = grade(&[single_choice(1, "Paris")], &normalized);
        assert!(graded[0].is_correct);
    }

    #[test]
    fn test_single_choice_empty_string_is_skipped() {
        let payload: AnswerPayload = serde_json::from_value(json!([
            {"questionId": 1, "selectedAnswer": ""}
        ]))
        .unwrap();
        let normalized = normalize_answers(Some(&payload));
        let graded = grade(&[single_choice(1, "Paris")], &normalized);
        assert!(!graded[0].is_correct);
        assert_eq!(graded[0].selected_answer, None);
    }

    #[test]
    fn test_multi_select_order_independent() {
        let questions = vec![multi_select(1, &["a", "b"])];
        assert!(grade(&questions, &[answer(1, &["b", "a"])])[0].is_correct);
        assert!(!grade(&questions, &[answer(1, &["a"])])[0].is_correct);
        assert!(!grade(&questions, &[answer(1, &["a", "b", "c"])])[0].is_correct);
    }

    #[test]
    fn test_multi_select_duplicates_fail_length_check() {
        let questions = vec![multi_select(1, &["a", "b"])];
        assert!(!grade(&questions, &[answer(1, &["a", "a"])])[0].is_correct);
    }

    #[test]
    fn test_skipped_question_grades_false() {
        let questions = vec![single_choice(1, "Paris"), single_choice(2, "London")];
        let graded = grade(&questions, &[answer(1, &["Paris"])]);
        assert_eq!(graded.len(), 2);
        assert!(graded[0].is_correct);
        assert!(!graded[1].is_correct);
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let mut question = single_choice(1, "Paris");
        question.question_type = "essay".to_string();
        let graded = grade(&[question], &[answer(1, &["Paris"])]);
        assert!(!graded[0].is_correct);
    }

    #[test]
    fn test_grading_is_deterministic() {
        let questions = vec![single_choice(1, "Paris"), multi_select(2, &["a", "c"])];
        let answers = vec![answer(1, &["Paris"]), answer(2, &["c", "a"])];
        let first = grade(&questions, &answers);
        let second = grade(&questions, &answers);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.is_correct, b.is_correct);
        }
    }

    #[test]
    fn test_normalize_map_payload() {
        let payload: AnswerPayload =
            serde_json::from_value(json!({"1": "Paris", "2": ["a", "b"]})).unwrap();
        let mut normalized = normalize_answers(Some(&payload));
        normalized.sort_by_key(|a| a.question_id);
        assert_eq!(normalized[0], answer(1, &["Paris"]));
        assert_eq!(normalized[1], answer(2, &["a", "b"]));
    }

    #[test]
    fn test_normalize_map_of_values_selection() {
        // Some clients send multiple-select answers as an index-keyed map.
        let payload: AnswerPayload = serde_json::from_value(json!([
            {"questionId": 1, "selectedAnswers": {"0": "a", "1": "b"}}
        ]))
        .unwrap();
        let normalized = normalize_answers(Some(&payload));
        let graded = grade(&[multi_select(1, &["a", "b"])], &normalized);
        assert!(graded[0].is_correct);
    }

    #[test]
    fn test_normalize_garbage_payload() {
        let payload: AnswerPayload = serde_json::from_value(json!("not answers")).unwrap();
        assert!(normalize_answers(Some(&payload)).is_empty());
        assert!(normalize_answers(None).is_empty());
    }

    #[test]
    fn test_normalize_drops_entries_without_question_id() {
        let payload: AnswerPayload = serde_json::from_value(json!([
            {"selectedAnswer": "Paris"},
            {"questionId": "2", "selectedAnswer": "London"}
        ]))
        .unwrap();
        let normalized = normalize_answers(Some(&payload));
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].question_id, 2);
    }

    #[test]
    fn test_score_rounding_half_up() {
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 2), 50);
        assert_eq!(score_percentage(3, 4), 75);
        assert_eq!(score_percentage(0, 0), 0);
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(score_percentage(0, 7), 0);
        assert_eq!(score_percentage(7, 7), 100);
    }

    #[test]
    fn test_letter_grade_thresholds() {
        assert_eq!(letter_grade(95), "A");
        assert_eq!(letter_grade(85), "B");
        assert_eq!(letter_grade(75), "C");
        assert_eq!(letter_grade(65), "D");
        assert_eq!(letter_grade(55), "F");
        // Boundary values take the higher grade.
        assert_eq!(letter_grade(90), "A");
        assert_eq!(letter_grade(80), "B");
        assert_eq!(letter_grade(70), "C");
        assert_eq!(letter_grade(60), "D");
    }

    #[test]
    fn test_three_correct_one_skipped_scores_75() {
        let questions = vec![
            single_choice(1, "Paris"),
            single_choice(2, "London"),
            single_choice(3, "Berlin"),
            single_choice(4, "Paris"),
        ];
        let answers = vec![
            answer(1, &["Paris"]),
            answer(2, &["London"]),
            answer(3, &["Berlin"]),
        ];
        let graded = grade(&questions, &answers);
        let correct = graded.iter().filter(|g| g.is_correct).count();
        let score = score_percentage(correct, questions.len());
        assert_eq!(score, 75);
        assert_eq!(letter_grade(score), "C");
    }
}
