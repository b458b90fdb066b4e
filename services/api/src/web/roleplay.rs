//! services/api/src/web/roleplay.rs
//!
//! REST handlers for the teach-back classroom. Typed teacher turns come in
//! here; spoken turns and the students' synthesized voices travel over the
//! WebSocket.

use crate::web::{
    rest::{reject, HandlerError},
    state::AppState,
    ws_handler::release_student,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::domain::Persona;
use study_assistant_core::StudyError;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct StartRoleplayRequest {
    topic: String,
    /// curious, confused, skeptical or argumentative; one student each.
    #[schema(value_type = Vec<String>)]
    personas: Vec<Persona>,
}

#[derive(Deserialize, ToSchema)]
pub struct TeachRequest {
    text: String,
}

#[derive(Serialize, ToSchema)]
pub struct RaisedHandsResponse {
    raised: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/roleplay",
    request_body = StartRoleplayRequest,
    responses(
        (status = 201, description = "The new classroom"),
        (status = 400, description = "Missing topic or students"),
        (status = 502, description = "The students could not be created")
    )
)]
pub async fn start_roleplay_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<StartRoleplayRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let classroom = app_state
        .assistant
        .start_roleplay(&req.topic, &req.personas)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(classroom)))
}

#[utoipa::path(
    get,
    path = "/roleplay",
    responses(
        (status = 200, description = "Students, hands and transcript"),
        (status = 404, description = "No roleplay is running")
    )
)]
pub async fn roleplay_state_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state
        .assistant
        .with_state(|s| s.classroom.clone())
        .await
        .map(Json)
        .ok_or_else(|| reject(StudyError::NotFound("no roleplay is running".to_string())))
}

#[utoipa::path(
    delete,
    path = "/roleplay",
    responses(
        (status = 204, description = "Classroom closed and its students released"),
        (status = 409, description = "No roleplay is running")
    )
)]
pub async fn end_roleplay_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<StatusCode, HandlerError> {
    app_state.assistant.end_roleplay().await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/roleplay/teach",
    request_body = TeachRequest,
    responses(
        (status = 200, description = "Students now raising a hand", body = RaisedHandsResponse),
        (status = 409, description = "No roleplay is running")
    )
)]
pub async fn teach_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<TeachRequest>,
) -> Result<Json<RaisedHandsResponse>, HandlerError> {
    let raised = app_state
        .assistant
        .teacher_says(Some(req.text), None)
        .await
        .map_err(reject)?;
    Ok(Json(RaisedHandsResponse { raised }))
}

/// Give the floor to a student with a raised hand. The reply text is returned
/// here; its audio follows on the WebSocket. With no client connected nobody
/// plays it, so the student is released immediately.
#[utoipa::path(
    post,
    path = "/roleplay/students/{id}/call",
    params(("id" = Uuid, Path, description = "The student to call on.")),
    responses(
        (status = 200, description = "The student's reply"),
        (status = 404, description = "No such student"),
        (status = 409, description = "The student's hand is down or they are still speaking"),
        (status = 502, description = "The student could not answer")
    )
)]
pub async fn call_on_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let reply = app_state.assistant.call_on(id).await.map_err(reject)?;
    if app_state.assistant.listener_count() == 0 {
        release_student(&app_state, id).await;
    }
    Ok(Json(reply))
}
