// src/scoring.rs

use std::collections::HashMap;

use serde::Serialize;

/// One entry of a quiz's answer key: the authoritative correct option and
/// point value for a question. Produced by `attempts::resolve_answer_key`
/// in ascending question-id order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKeyEntry {
    pub question_id: i64,
    pub correct_option: String,
    pub points: i64,
}

/// A normalized submission: question id -> chosen option label.
/// Questions absent from the map are unanswered.
pub type Submission = HashMap<i64, String>;

/// Per-question outcome, in the same order as the answer key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionScore {
    pub question_id: i64,
    pub correct_option: String,
    pub student_answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i64,
}

/// Aggregate scoring outcome for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub per_question: Vec<QuestionScore>,
    pub correct_count: i64,
    pub total_points: i64,
    pub max_points: i64,
    /// Integer percentage 0-100; 0 when the quiz has no questions.
    pub percentage: i64,
}

/// Reduces a raw answer map (string keys, arbitrary values) to the
/// `Submission` shape. Non-numeric keys and labels outside {A,B,C,D} are
/// dropped, which downstream scoring treats as unanswered. Both the JSON
/// and the form-encoded entry points funnel through here.
pub fn normalize_answers(raw: &HashMap<String, String>) -> Submission {
    raw.iter()
        .filter_map(|(key, value)| {
            let question_id = key.trim().parse::<i64>().ok()?;
            match value.as_str() {
                "A" | "B" | "C" | "D" => Some((question_id, value.clone())),
                _ => None,
            }
        })
        .collect()
}

/// A question's effective point value. Non-positive values (legacy rows,
/// unset defaults) count as 1 point; this is the single place the default
/// is applied.
fn effective_points(entry: &AnswerKeyEntry) -> i64 {
    if entry.points > 0 { entry.points } else { 1 }
}

/// Integer percentage of `total` out of `max`, rounded half away from zero
/// (both inputs are non-negative, so this is round-half-up). Defined as 0
/// when `max` is 0.
fn percentage(total_points: i64, max_points: i64) -> i64 {
    if max_points <= 0 {
        return 0;
    }
    ((total_points as f64 / max_points as f64) * 100.0).round() as i64
}

/// Scores one submission against an answer key.
///
/// Pure and deterministic: no I/O, no clock, no randomness. Correctness is
/// exact string equality with the key's option label; unanswered and
/// wrongly-answered questions both earn 0 points. Output order matches the
/// answer key's order.
pub fn score(answer_key: &[AnswerKeyEntry], submission: &Submission) -> ScoreResult {
    let mut per_question = Vec::with_capacity(answer_key.len());
    let mut correct_count = 0;
    let mut total_points = 0;
    let mut max_points = 0;

    for entry in answer_key {
        let question_points = effective_points(entry);
        max_points += question_points;

        let student_answer = submission.get(&entry.question_id).cloned();
        let is_correct = student_answer.as_deref() == Some(entry.correct_option.as_str());

        let points_earned = if is_correct {
            correct_count += 1;
            total_points += question_points;
            question_points
        } else {
            0
        };

        per_question.push(QuestionScore {
            question_id: entry.question_id,
            correct_option: entry.correct_option.clone(),
            student_answer,
            is_correct,
            points_earned,
        });
    }

    ScoreResult {
        per_question,
        correct_count,
        total_points,
        max_points,
        percentage: percentage(total_points, max_points),
    }
}
