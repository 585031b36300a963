// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// Represents the 'attempts' table in the database.
/// One row per scoring event for one user/quiz pair; never mutated after
/// creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    /// Integer percentage 0-100, `round(total_points / max_points * 100)`.
    pub score: i64,
    pub total_points: i64,
    pub max_points: i64,

    /// Elapsed time in seconds, if the client reported it.
    pub time_taken: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting quiz answers (JSON entry point).
///
/// Keys are question ids as strings; malformed keys or labels outside A-D
/// are treated as unanswered rather than rejected.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: HashMap<String, String>,
    pub time_taken: Option<i64>,
}

/// Attempt row joined with its quiz title, for history listings.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i64,
    pub total_points: i64,
    pub max_points: i64,
    pub time_taken: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Attempt row joined with the student's name, for instructor review of a
/// quiz's attempts.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizAttemptEntry {
    pub id: i64,
    pub user_id: i64,
    pub student_name: String,
    pub score: i64,
    pub total_points: i64,
    pub max_points: i64,
    pub time_taken: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One attempt_details row joined with its originating question, ordered by
/// question id within the parent view.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptDetailView {
    pub question_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
    pub points: i64,
    pub student_answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i64,
}

/// Full reconstruction of one attempt for display/audit.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub attempt: Attempt,
    pub quiz_title: String,
    pub details: Vec<AttemptDetailView>,
}
