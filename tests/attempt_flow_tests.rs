// tests/attempt_flow_tests.rs
//
// End-to-end coverage of the attempt workflow: resolve the answer key,
// score, record atomically, reconstruct.

use quizdeck::{
    attempts,
    config::Config,
    routes,
    scoring::{QuestionScore, ScoreResult},
    state::AppState,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid test database URL")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate test database");

    pool
}

async fn spawn_app(pool: SqlitePool) -> String {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    name: &str,
    role: &str,
) -> String {
    let email = format!("{}_{}@example.com", name, &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": name,
            "email": email,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .expect("Register failed");

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login_resp["token"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

/// Creates a published quiz with the given questions, returning
/// (quiz id, question ids in authoring order).
async fn seed_quiz(
    client: &reqwest::Client,
    address: &str,
    instructor_token: &str,
    questions: &[(&str, i64)], // (correct_option, points)
) -> (i64, Vec<i64>) {
    let quiz_id = client
        .post(format!("{}/api/instructor/quizzes", address))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({ "title": "Seeded quiz" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let mut question_ids = Vec::new();
    for (i, (correct_option, points)) in questions.iter().enumerate() {
        let id = client
            .post(format!(
                "{}/api/instructor/quizzes/{}/questions",
                address, quiz_id
            ))
            .header("Authorization", format!("Bearer {}", instructor_token))
            .json(&serde_json::json!({
                "question_text": format!("Question {}", i + 1),
                "option_a": "Option A",
                "option_b": "Option B",
                "option_c": "Option C",
                "option_d": "Option D",
                "correct_option": correct_option,
                "points": points
            }))
            .send()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap()["id"]
            .as_i64()
            .unwrap();
        question_ids.push(id);
    }

    client
        .put(format!(
            "{}/api/instructor/quizzes/{}/publish",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({ "is_published": true }))
        .send()
        .await
        .unwrap();

    (quiz_id, question_ids)
}

#[tokio::test]
async fn submit_scores_and_records_attempt() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    // Two 1-point questions with answers A and B.
    let (quiz_id, question_ids) =
        seed_quiz(&client, &address, &instructor, &[("A", 1), ("B", 1)]).await;

    // One right, one wrong: 1/2 points = 50%.
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .json(&serde_json::json!({
            "answers": {
                question_ids[0].to_string(): "A",
                question_ids[1].to_string(): "C"
            },
            "time_taken": 42
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["success"], true);
    assert_eq!(result["score"], 50);
    assert_eq!(result["total_points"], 1);
    assert_eq!(result["max_points"], 2);
    assert_eq!(result["correct_count"], 1);
    assert_eq!(result["total_questions"], 2);

    let attempt_id = result["attempt_id"].as_i64().unwrap();

    // Reconstruct: one detail per question, in question-id order.
    let view: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(view["attempt"]["score"], 50);
    assert_eq!(view["attempt"]["time_taken"], 42);
    assert_eq!(view["quiz_title"], "Seeded quiz");

    let details = view["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["question_id"].as_i64().unwrap(), question_ids[0]);
    assert_eq!(details[1]["question_id"].as_i64().unwrap(), question_ids[1]);
    assert_eq!(details[0]["student_answer"], "A");
    assert_eq!(details[0]["is_correct"], true);
    assert_eq!(details[0]["points_earned"], 1);
    assert_eq!(details[1]["student_answer"], "C");
    assert_eq!(details[1]["is_correct"], false);
    assert_eq!(details[1]["points_earned"], 0);
}

#[tokio::test]
async fn empty_quiz_scores_zero_percent() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    let (quiz_id, _) = seed_quiz(&client, &address, &instructor, &[]).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .json(&serde_json::json!({ "answers": {} }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["score"], 0);
    assert_eq!(result["max_points"], 0);
    assert_eq!(result["total_points"], 0);
    assert_eq!(result["total_questions"], 0);
}

#[tokio::test]
async fn unanswered_weighted_question_scores_zero() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    let (quiz_id, _) = seed_quiz(&client, &address, &instructor, &[("C", 5)]).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .json(&serde_json::json!({ "answers": {} }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["correct_count"], 0);
    assert_eq!(result["total_points"], 0);
    assert_eq!(result["max_points"], 5);
    assert_eq!(result["score"], 0);
}

#[tokio::test]
async fn form_entry_point_matches_json_entry_point() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    let (quiz_id, question_ids) =
        seed_quiz(&client, &address, &instructor, &[("A", 1), ("B", 1)]).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit-form", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .form(&[
            (question_ids[0].to_string(), "A".to_string()),
            (question_ids[1].to_string(), "C".to_string()),
            ("time_taken".to_string(), "30".to_string()),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["score"], 50);
    assert_eq!(result["total_points"], 1);
    assert_eq!(result["max_points"], 2);

    let attempt_id = result["attempt_id"].as_i64().unwrap();
    let view: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["attempt"]["time_taken"], 30);
}

#[tokio::test]
async fn attempts_are_not_visible_to_other_students() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;
    let other = register_and_login(&client, &address, "other", "student").await;

    let (quiz_id, question_ids) = seed_quiz(&client, &address, &instructor, &[("A", 1)]).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .json(&serde_json::json!({
            "answers": { question_ids[0].to_string(): "A" }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = result["attempt_id"].as_i64().unwrap();

    // A different student gets 404, indistinguishable from "does not exist".
    let response = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", other))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // The owning instructor can review it.
    let response = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // And sees it in the per-quiz attempt listing.
    let listing: serde_json::Value = client
        .get(format!(
            "{}/api/instructor/quizzes/{}/attempts",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["student_name"], "student");
}

#[tokio::test]
async fn attempt_history_lists_own_attempts() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    let (quiz_id, question_ids) = seed_quiz(&client, &address, &instructor, &[("A", 1)]).await;

    // Two submissions are two independent attempts.
    for answer in ["A", "B"] {
        client
            .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
            .header("Authorization", format!("Bearer {}", student))
            .json(&serde_json::json!({
                "answers": { question_ids[0].to_string(): answer }
            }))
            .send()
            .await
            .unwrap();
    }

    let history: serde_json::Value = client
        .get(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // Newest first: the wrong answer (0%) was submitted last.
    assert_eq!(entries[0]["score"], 0);
    assert_eq!(entries[1]["score"], 100);
    assert_eq!(entries[0]["quiz_title"], "Seeded quiz");
}

#[tokio::test]
async fn question_set_is_frozen_once_attempted() {
    let address = spawn_app(test_pool().await).await;
    let client = reqwest::Client::new();
    let instructor = register_and_login(&client, &address, "teacher", "instructor").await;
    let student = register_and_login(&client, &address, "student", "student").await;

    let (quiz_id, question_ids) = seed_quiz(&client, &address, &instructor, &[("A", 1)]).await;

    client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student))
        .json(&serde_json::json!({
            "answers": { question_ids[0].to_string(): "A" }
        }))
        .send()
        .await
        .unwrap();

    // Adding, updating, and deleting questions are all refused now.
    let response = client
        .post(format!(
            "{}/api/instructor/quizzes/{}/questions",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", instructor))
        .json(&serde_json::json!({
            "question_text": "Late question",
            "option_a": "1", "option_b": "2", "option_c": "3", "option_d": "4",
            "correct_option": "A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .put(format!(
            "{}/api/instructor/quizzes/{}/questions/{}",
            address, quiz_id, question_ids[0]
        ))
        .header("Authorization", format!("Bearer {}", instructor))
        .json(&serde_json::json!({ "correct_option": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .delete(format!(
            "{}/api/instructor/quizzes/{}/questions/{}",
            address, quiz_id, question_ids[0]
        ))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // So is deleting the quiz itself.
    let response = client
        .delete(format!("{}/api/instructor/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn failed_detail_insert_rolls_back_the_attempt() {
    let pool = test_pool().await;

    // Seed a user, a quiz and one real question directly.
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role)
         VALUES ('student', 'student@example.com', 'hash', 'student') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let quiz_id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (instructor_id, title) VALUES (?, 'Quiz') RETURNING id",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let question_id: i64 = sqlx::query_scalar(
        "INSERT INTO questions
             (quiz_id, question_text, option_a, option_b, option_c, option_d, correct_option)
         VALUES (?, 'Q1', 'a', 'b', 'c', 'd', 'A') RETURNING id",
    )
    .bind(quiz_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    // The last detail references a question that does not exist, so its
    // insert violates the foreign key after the parent and the first
    // detail already succeeded.
    let result = ScoreResult {
        per_question: vec![
            QuestionScore {
                question_id,
                correct_option: "A".to_string(),
                student_answer: Some("A".to_string()),
                is_correct: true,
                points_earned: 1,
            },
            QuestionScore {
                question_id: 999_999,
                correct_option: "A".to_string(),
                student_answer: None,
                is_correct: false,
                points_earned: 0,
            },
        ],
        correct_count: 1,
        total_points: 1,
        max_points: 2,
        percentage: 50,
    };

    let outcome = attempts::record_attempt(&pool, user_id, quiz_id, &result, None).await;
    assert!(outcome.is_err());

    // The whole write rolled back: no attempt, no details.
    let attempt_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(attempt_count, 0);

    let detail_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempt_details")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(detail_count, 0);
}

#[tokio::test]
async fn resolver_orders_key_and_reports_missing_quiz() {
    let pool = test_pool().await;

    let missing = attempts::resolve_answer_key(&pool, 12345).await;
    assert!(missing.is_err());

    let instructor_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role)
         VALUES ('teacher', 'teacher@example.com', 'hash', 'instructor') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let quiz_id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (instructor_id, title) VALUES (?, 'Quiz') RETURNING id",
    )
    .bind(instructor_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    for (correct, points) in [("B", 3), ("D", 1)] {
        sqlx::query(
            "INSERT INTO questions
                 (quiz_id, question_text, option_a, option_b, option_c, option_d,
                  correct_option, points)
             VALUES (?, 'Q', 'a', 'b', 'c', 'd', ?, ?)",
        )
        .bind(quiz_id)
        .bind(correct)
        .bind(points)
        .execute(&pool)
        .await
        .unwrap();
    }

    let key = attempts::resolve_answer_key(&pool, quiz_id).await.unwrap();
    assert_eq!(key.len(), 2);
    assert!(key[0].question_id < key[1].question_id);
    assert_eq!(key[0].correct_option, "B");
    assert_eq!(key[0].points, 3);
    assert_eq!(key[1].correct_option, "D");

    // A quiz with no questions resolves to an empty key.
    let empty_quiz: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (instructor_id, title) VALUES (?, 'Empty') RETURNING id",
    )
    .bind(instructor_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let key = attempts::resolve_answer_key(&pool, empty_quiz).await.unwrap();
    assert!(key.is_empty());
}
