// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// Owning instructor.
    pub instructor_id: i64,

    pub title: String,

    pub description: Option<String>,

    /// Optional time limit in seconds.
    pub time_limit: Option<i64>,

    /// Only published quizzes are visible to students.
    pub is_published: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Time limit must be positive."))]
    pub time_limit: Option<i64>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_limit: Option<i64>,
}

/// DTO for publishing/unpublishing a quiz.
#[derive(Debug, Deserialize)]
pub struct PublishQuizRequest {
    pub is_published: bool,
}
