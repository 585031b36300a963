// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, attempts, instructor).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Student-facing: browse published quizzes, submit, review own attempts.
    let quiz_routes = Router::new()
        .route("/", get(attempt::list_published_quizzes))
        .route("/{id}", get(attempt::get_quiz_for_taking))
        .route("/{id}/submit", post(attempt::submit_quiz))
        .route("/{id}/submit-form", post(attempt::submit_quiz_form))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/", get(attempt::my_attempts))
        .route("/{id}", get(attempt::get_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let instructor_routes = Router::new()
        .route("/quizzes", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route(
            "/quizzes/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/quizzes/{id}/publish", put(quiz::publish_quiz))
        .route("/quizzes/{id}/attempts", get(quiz::list_quiz_attempts))
        .route("/quizzes/{id}/questions", post(quiz::create_question))
        .route(
            "/quizzes/{id}/questions/{question_id}",
            put(quiz::update_question).delete(quiz::delete_question),
        )
        // Double middleware protection: Auth first, then role check
        .layer(middleware::from_fn(instructor_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/instructor", instructor_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
