// src/handlers/quiz.rs
//
// Instructor-side quiz and question management. Every operation is scoped
// to the authenticated instructor's own quizzes; a quiz belonging to
// someone else reads as "not found" rather than "forbidden".

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    attempts,
    error::AppError,
    models::{
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, PublishQuizRequest, Quiz, UpdateQuizRequest},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Fetches a quiz owned by the given instructor, or `NotFound`.
async fn quiz_owned_by(
    pool: &SqlitePool,
    quiz_id: i64,
    instructor_id: i64,
) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ? AND instructor_id = ?")
        .bind(quiz_id)
        .bind(instructor_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Rejects question-set mutations once the quiz has been attempted.
async fn ensure_no_attempts(pool: &SqlitePool, quiz_id: i64) -> Result<(), AppError> {
    if attempts::quiz_has_attempts(pool, quiz_id).await? {
        return Err(AppError::Conflict(
            "Quiz already has attempts; its questions can no longer change".to_string(),
        ));
    }
    Ok(())
}

/// Lists the authenticated instructor's quizzes, newest first.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        "SELECT * FROM quizzes WHERE instructor_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Creates a new (unpublished) quiz owned by the caller.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (instructor_id, title, description, time_limit)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(claims.user_id())
    .bind(clean_html(&payload.title))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.time_limit)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Fetches one of the caller's quizzes with its full question list,
/// correct options included.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = ? ORDER BY id ASC",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "quiz": quiz,
        "questions": questions
    })))
}

/// Updates quiz metadata (title, description, time limit).
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;

    if payload.title.is_none() && payload.description.is_none() && payload.time_limit.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(clean_html(&title));
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(time_limit) = payload.time_limit {
        separated.push("time_limit = ");
        separated.push_bind_unseparated(time_limit);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(quiz_id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

/// Publishes or unpublishes a quiz.
pub async fn publish_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<PublishQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;

    sqlx::query("UPDATE quizzes SET is_published = ? WHERE id = ?")
        .bind(payload.is_published)
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({ "is_published": payload.is_published })))
}

/// Deletes one of the caller's quizzes (and its questions, by cascade).
/// Refused once the quiz has attempts: attempt records are never deleted.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;

    if attempts::quiz_has_attempts(&pool, quiz_id).await? {
        return Err(AppError::Conflict(
            "Quiz already has attempts and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::Persistence(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to one of the caller's quizzes.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;
    ensure_no_attempts(&pool, quiz_id).await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (quiz_id, question_text, option_a, option_b, option_c, option_d,
             correct_option, points)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(clean_html(&payload.question_text))
    .bind(clean_html(&payload.option_a))
    .bind(clean_html(&payload.option_b))
    .bind(clean_html(&payload.option_c))
    .bind(clean_html(&payload.option_d))
    .bind(&payload.correct_option)
    .bind(payload.points.unwrap_or(1))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates a question on one of the caller's quizzes.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;
    ensure_no_attempts(&pool, quiz_id).await?;

    if let Some(option) = payload.correct_option.as_deref() {
        if !matches!(option, "A" | "B" | "C" | "D") {
            return Err(AppError::BadRequest(
                "Correct option must be one of A, B, C, D".to_string(),
            ));
        }
    }
    if let Some(points) = payload.points {
        if points < 1 {
            return Err(AppError::BadRequest("Points must be positive".to_string()));
        }
    }

    if payload.question_text.is_none()
        && payload.option_a.is_none()
        && payload.option_b.is_none()
        && payload.option_c.is_none()
        && payload.option_d.is_none()
        && payload.correct_option.is_none()
        && payload.points.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(clean_html(&question_text));
    }

    if let Some(option_a) = payload.option_a {
        separated.push("option_a = ");
        separated.push_bind_unseparated(clean_html(&option_a));
    }

    if let Some(option_b) = payload.option_b {
        separated.push("option_b = ");
        separated.push_bind_unseparated(clean_html(&option_b));
    }

    if let Some(option_c) = payload.option_c {
        separated.push("option_c = ");
        separated.push_bind_unseparated(clean_html(&option_c));
    }

    if let Some(option_d) = payload.option_d {
        separated.push("option_d = ");
        separated.push_bind_unseparated(clean_html(&option_d));
    }

    if let Some(correct_option) = payload.correct_option {
        separated.push("correct_option = ");
        separated.push_bind_unseparated(correct_option);
    }

    if let Some(points) = payload.points {
        separated.push("points = ");
        separated.push_bind_unseparated(points);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(question_id);
    builder.push(" AND quiz_id = ");
    builder.push_bind(quiz_id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question from one of the caller's quizzes.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;
    ensure_no_attempts(&pool, quiz_id).await?;

    let result = sqlx::query("DELETE FROM questions WHERE id = ? AND quiz_id = ?")
        .bind(question_id)
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::Persistence(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every attempt against one of the caller's quizzes, newest first.
pub async fn list_quiz_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    quiz_owned_by(&pool, quiz_id, claims.user_id()).await?;

    let entries = attempts::list_attempts_for_quiz(&pool, quiz_id).await?;

    Ok(Json(entries))
}
