// src/handlers/attempt.rs
//
// Student-side routes: browse published quizzes, submit answers, review
// past attempts. Submission runs resolve -> score -> record; scoring itself
// is the pure function in `scoring`.

use std::collections::HashMap;

use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    attempts,
    error::AppError,
    models::{
        attempt::SubmitAttemptRequest,
        question::PublicQuestion,
        quiz::Quiz,
    },
    scoring,
    utils::jwt::Claims,
};

/// Lists published quizzes, newest first.
pub async fn list_published_quizzes(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        "SELECT * FROM quizzes WHERE is_published = TRUE ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list published quizzes: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Fetches a published quiz with its questions for taking.
/// Correct options are withheld via the `PublicQuestion` DTO.
pub async fn get_quiz_for_taking(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT * FROM quizzes WHERE id = ? AND is_published = TRUE",
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Quiz not found or not published".to_string(),
    ))?;

    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, question_text, option_a, option_b, option_c, option_d, points
        FROM questions
        WHERE quiz_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "quiz": {
            "id": quiz.id,
            "title": quiz.title,
            "description": quiz.description,
            "time_limit": quiz.time_limit,
        },
        "questions": questions
    })))
}

/// Scores a submission and records the attempt, returning the aggregates
/// and the new attempt id.
async fn submit_answers(
    pool: &SqlitePool,
    claims: &Claims,
    quiz_id: i64,
    raw_answers: &HashMap<String, String>,
    time_taken: Option<i64>,
) -> Result<serde_json::Value, AppError> {
    let answer_key = attempts::resolve_answer_key(pool, quiz_id).await?;
    let submission = scoring::normalize_answers(raw_answers);
    let result = scoring::score(&answer_key, &submission);

    let attempt_id =
        attempts::record_attempt(pool, claims.user_id(), quiz_id, &result, time_taken).await?;

    Ok(serde_json::json!({
        "success": true,
        "attempt_id": attempt_id,
        "score": result.percentage,
        "total_points": result.total_points,
        "max_points": result.max_points,
        "correct_count": result.correct_count,
        "total_questions": result.per_question.len(),
    }))
}

/// Submits quiz answers (JSON entry point).
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let body = submit_answers(
        &pool,
        &claims,
        quiz_id,
        &payload.answers,
        payload.time_taken,
    )
    .await?;

    Ok(Json(body))
}

/// Submits quiz answers (form-encoded entry point).
///
/// Fields are question-id/label pairs, plus an optional `time_taken` field.
/// Both entry points reduce to the same submission shape before scoring.
pub async fn submit_quiz_form(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Form(mut fields): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let time_taken = fields
        .remove("time_taken")
        .and_then(|v| v.parse::<i64>().ok());

    let body = submit_answers(&pool, &claims, quiz_id, &fields, time_taken).await?;

    Ok(Json(body))
}

/// Lists the caller's own attempt history, newest first.
pub async fn my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = attempts::list_attempts_for_user(&pool, claims.user_id()).await?;

    Ok(Json(history))
}

/// Reconstructs one attempt with its per-question details.
/// Visible to the attempt's owner and the owning instructor only.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = attempts::load_attempt(&pool, attempt_id, &claims).await?;

    Ok(Json(view))
}
