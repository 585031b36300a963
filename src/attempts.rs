// src/attempts.rs
//
// Data access for the attempt workflow: answer key resolution, atomic
// attempt recording, and attempt reconstruction. Handlers stay thin and the
// scoring itself lives in `scoring` as a pure function.

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{Attempt, AttemptDetailView, AttemptSummary, AttemptView, QuizAttemptEntry},
    scoring::{AnswerKeyEntry, ScoreResult},
    utils::jwt::Claims,
};

/// Loads the answer key for a quiz: every question's id, correct option and
/// point value, ordered by ascending question id (authoring order).
///
/// Re-validates that the quiz exists; an empty key (quiz with no questions)
/// is valid. Read-only.
pub async fn resolve_answer_key(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<AnswerKeyEntry>, AppError> {
    let quiz_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?;

    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let answer_key = sqlx::query_as::<_, AnswerKeyEntry>(
        r#"
        SELECT id AS question_id, correct_option, points
        FROM questions
        WHERE quiz_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(answer_key)
}

/// Persists one attempt plus its per-question details as a single
/// transaction. The attempt row and all detail rows become visible together
/// or not at all: any insert failure rolls the whole write back (the
/// transaction is dropped uncommitted) and no partial attempt survives.
///
/// Returns the new attempt id. Re-submitting after a failure is safe; each
/// call creates a fresh attempt.
pub async fn record_attempt(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
    result: &ScoreResult,
    time_taken: Option<i64>,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (user_id, quiz_id, score, total_points, max_points, time_taken)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(result.percentage)
    .bind(result.total_points)
    .bind(result.max_points)
    .bind(time_taken)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert attempt for quiz {}: {:?}", quiz_id, e);
        AppError::Persistence(e.to_string())
    })?;

    for detail in &result.per_question {
        sqlx::query(
            r#"
            INSERT INTO attempt_details
                (attempt_id, question_id, student_answer, is_correct, points_earned)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(attempt_id)
        .bind(detail.question_id)
        .bind(&detail.student_answer)
        .bind(detail.is_correct)
        .bind(detail.points_earned)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to insert detail for attempt {} question {}: {:?}",
                attempt_id,
                detail.question_id,
                e
            );
            AppError::Persistence(e.to_string())
        })?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    Ok(attempt_id)
}

/// Reconstructs one attempt for display/audit: the attempt row, its quiz
/// title, and its details joined with their originating questions, ordered
/// by ascending question id.
///
/// Visible to the attempt's owning user and to the instructor who owns the
/// quiz. Everyone else gets `NotFound`; "does not exist" and "not yours"
/// are deliberately indistinguishable.
pub async fn load_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
    claims: &Claims,
) -> Result<AttemptView, AppError> {
    let not_found = || AppError::NotFound("Attempt not found".to_string());

    let attempt = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = ?")
        .bind(attempt_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)?;

    let (quiz_title, instructor_id): (String, i64) =
        sqlx::query_as("SELECT title, instructor_id FROM quizzes WHERE id = ?")
            .bind(attempt.quiz_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(not_found)?;

    let caller_id = claims.user_id();
    let is_owner = caller_id == attempt.user_id;
    let is_owning_instructor = claims.role == "instructor" && caller_id == instructor_id;

    if !is_owner && !is_owning_instructor {
        return Err(not_found());
    }

    let details = sqlx::query_as::<_, AttemptDetailView>(
        r#"
        SELECT
            d.question_id,
            q.question_text,
            q.option_a, q.option_b, q.option_c, q.option_d,
            q.correct_option,
            q.points,
            d.student_answer,
            d.is_correct,
            d.points_earned
        FROM attempt_details d
        JOIN questions q ON q.id = d.question_id
        WHERE d.attempt_id = ?
        ORDER BY d.question_id ASC
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    Ok(AttemptView {
        attempt,
        quiz_title,
        details,
    })
}

/// Lists a user's own attempt history, newest first.
pub async fn list_attempts_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<AttemptSummary>, AppError> {
    let attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.id, a.quiz_id, q.title AS quiz_title,
            a.score, a.total_points, a.max_points, a.time_taken, a.created_at
        FROM attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        WHERE a.user_id = ?
        ORDER BY a.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(attempts)
}

/// Lists every attempt against one quiz, newest first. Ownership of the
/// quiz is the caller's responsibility to check.
pub async fn list_attempts_for_quiz(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<QuizAttemptEntry>, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttemptEntry>(
        r#"
        SELECT
            a.id, a.user_id, u.name AS student_name,
            a.score, a.total_points, a.max_points, a.time_taken, a.created_at
        FROM attempts a
        JOIN users u ON u.id = a.user_id
        WHERE a.quiz_id = ?
        ORDER BY a.id DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(attempts)
}

/// Whether any attempt exists against the quiz. Once one does, the quiz's
/// question set is frozen and the quiz itself can no longer be deleted.
pub async fn quiz_has_attempts(pool: &SqlitePool, quiz_id: i64) -> Result<bool, AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM attempts WHERE quiz_id = ? LIMIT 1")
            .bind(quiz_id)
            .fetch_optional(pool)
            .await?;

    Ok(existing.is_some())
}
