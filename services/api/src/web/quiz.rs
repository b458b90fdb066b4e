//! services/api/src/web/quiz.rs
//!
//! REST handlers driving the quiz engine: setup, generation, answering,
//! mistake capture and the result history.

use crate::web::{
    rest::{reject, HandlerError},
    state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use study_assistant_core::domain::{Difficulty, MistakeCategory, QuestionType};
use utoipa::ToSchema;

//=========================================================================================
// Request Payloads
//=========================================================================================

/// Any subset of the quiz settings, applied all or nothing. Only accepted while
/// in setup.
#[derive(Deserialize, ToSchema)]
pub struct QuizSetupRequest {
    topics: Option<Vec<String>>,
    /// Easy, Medium or Hard.
    #[schema(value_type = Option<String>)]
    difficulty: Option<Difficulty>,
    /// Questions per section, 1 to 50.
    question_count: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct QuestionTypeRequest {
    /// choose, fillBlank, match or answer.
    #[schema(value_type = String)]
    question_type: QuestionType,
}

/// One edit of the draft answer for the current question.
#[derive(Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerRequest {
    Choose { option: String },
    FillBlank { text: String },
    Match { left: String, right: String },
    Answer { text: String },
}

#[derive(Deserialize, ToSchema)]
pub struct MistakeRequest {
    /// One of "Concept Error", "Calculation", "Misread Question", "Guessing".
    #[schema(value_type = String)]
    category: MistakeCategory,
    #[serde(default)]
    note: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/quiz",
    responses((status = 200, description = "Phase, settings, current quiz and draft"))
)]
pub async fn quiz_state_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = app_state.assistant.with_state(|s| s.quiz.clone()).await;
    Json(engine)
}

#[utoipa::path(
    put,
    path = "/quiz/setup",
    request_body = QuizSetupRequest,
    responses(
        (status = 204, description = "Settings updated"),
        (status = 400, description = "Question count out of range"),
        (status = 409, description = "A quiz is running")
    )
)]
pub async fn quiz_setup_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<QuizSetupRequest>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .assistant
        .with_state(|s| s.quiz.configure(req.topics, req.difficulty, req.question_count))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/quiz/generate",
    responses(
        (status = 200, description = "The generated quiz, now active"),
        (status = 400, description = "No topics, sources or previous query to build from"),
        (status = 502, description = "The quiz could not be generated")
    )
)]
pub async fn quiz_generate_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let quiz = app_state.assistant.generate_quiz().await.map_err(reject)?;
    Ok(Json(quiz))
}

#[utoipa::path(
    post,
    path = "/quiz/type",
    request_body = QuestionTypeRequest,
    responses(
        (status = 204, description = "Section switched"),
        (status = 409, description = "No quiz is active")
    )
)]
pub async fn quiz_type_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<QuestionTypeRequest>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .assistant
        .with_state(|s| s.quiz.select_type(req.question_type))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/quiz/answer",
    request_body = AnswerRequest,
    responses(
        (status = 204, description = "Draft updated"),
        (status = 409, description = "The question is already graded")
    )
)]
pub async fn quiz_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .assistant
        .with_state(|s| match req {
            AnswerRequest::Choose { option } => s.quiz.choose_option(option),
            AnswerRequest::FillBlank { text } => s.quiz.fill_blank(text),
            AnswerRequest::Match { left, right } => s.quiz.select_match(left, right),
            AnswerRequest::Answer { text } => s.quiz.write_answer(text),
        })
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/quiz/submit",
    responses(
        (status = 200, description = "The verdict for the current question"),
        (status = 400, description = "Nothing selected yet")
    )
)]
pub async fn quiz_submit_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let verdict = app_state
        .assistant
        .with_state(|s| s.quiz.submit())
        .await
        .map_err(reject)?;
    Ok(Json(verdict))
}

#[utoipa::path(
    post,
    path = "/quiz/mistake",
    request_body = MistakeRequest,
    responses(
        (status = 201, description = "The recorded mistake"),
        (status = 409, description = "No wrong answer is waiting")
    )
)]
pub async fn quiz_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<MistakeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let item = app_state
        .assistant
        .with_state(|s| s.record_mistake(req.category, req.note))
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    post,
    path = "/quiz/next",
    responses(
        (status = 200, description = "The section result once the last question was passed, else null"),
        (status = 409, description = "The current question is not graded")
    )
)]
pub async fn quiz_next_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let result = app_state
        .assistant
        .with_state(|s| s.advance_quiz())
        .await
        .map_err(reject)?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/quiz/reset",
    responses((status = 204, description = "Back to setup, settings kept"))
)]
pub async fn quiz_reset_handler(State(app_state): State<Arc<AppState>>) -> StatusCode {
    app_state.assistant.with_state(|s| s.quiz.return_to_setup()).await;
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/quiz/history",
    responses((status = 200, description = "Every completed section, oldest first"))
)]
pub async fn quiz_history_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let history = app_state
        .assistant
        .with_state(|s| s.quiz_history.clone())
        .await;
    Json(history)
}
