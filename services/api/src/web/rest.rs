//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chat, source, artifact, mistake and
//! metrics endpoints, the mapping of core errors onto HTTP statuses, and the
//! master definition for the OpenAPI specification.

use crate::import::{import_link, import_upload};
use crate::web::{quiz, roleplay, state::AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::domain::{ArtifactKind, ChatSession, MistakeCategory, Tab};
use study_assistant_core::{ArtifactsView, MetricsReport, StudyError};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_sessions_handler,
        create_session_handler,
        select_session_handler,
        delete_session_handler,
        list_sources_handler,
        upload_sources_handler,
        add_link_handler,
        toggle_source_handler,
        delete_source_handler,
        delete_selected_sources_handler,
        query_handler,
        artifacts_handler,
        regenerate_handler,
        verify_handler,
        list_mistakes_handler,
        update_mistake_handler,
        delete_mistake_handler,
        metrics_handler,
        quiz::quiz_state_handler,
        quiz::quiz_setup_handler,
        quiz::quiz_generate_handler,
        quiz::quiz_type_handler,
        quiz::quiz_answer_handler,
        quiz::quiz_submit_handler,
        quiz::quiz_mistake_handler,
        quiz::quiz_next_handler,
        quiz::quiz_reset_handler,
        quiz::quiz_history_handler,
        roleplay::start_roleplay_handler,
        roleplay::roleplay_state_handler,
        roleplay::end_roleplay_handler,
        roleplay::teach_handler,
        roleplay::call_on_handler,
    ),
    components(
        schemas(
            QueryRequest,
            LinkRequest,
            ToggleResponse,
            RemovedResponse,
            MistakePatch,
            quiz::QuizSetupRequest,
            quiz::QuestionTypeRequest,
            quiz::AnswerRequest,
            quiz::MistakeRequest,
            roleplay::StartRoleplayRequest,
            roleplay::TeachRequest,
            roleplay::RaisedHandsResponse,
        )
    ),
    tags(
        (name = "Study Assistant API", description = "Chat, artifact generation, quizzes and teach-back roleplay.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// The error half of every handler result: a status and a plain-text message.
pub type HandlerError = (StatusCode, String);

/// Maps a core error onto its HTTP status.
pub fn reject(e: StudyError) -> HandlerError {
    let status = match &e {
        StudyError::Validation(_) | StudyError::UnsupportedInput(_) => StatusCode::BAD_REQUEST,
        StudyError::NotFound(_) => StatusCode::NOT_FOUND,
        StudyError::InvalidState(_) | StudyError::DuplicateId(_) => StatusCode::CONFLICT,
        StudyError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

fn not_found(what: &str, id: Uuid) -> HandlerError {
    reject(StudyError::NotFound(format!("{} {}", what, id)))
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize)]
pub struct SessionsResponse {
    current_id: Uuid,
    sessions: Vec<ChatSession>,
}

#[derive(Deserialize, ToSchema)]
pub struct QueryRequest {
    text: String,
    /// The tab on screen: explanation, visual, simulation, verification, quiz, metrics or roleplay.
    #[schema(value_type = String)]
    active_tab: Tab,
}

#[derive(Deserialize, ToSchema)]
pub struct LinkRequest {
    url: String,
    title: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ToggleResponse {
    is_selected: bool,
}

#[derive(Serialize, ToSchema)]
pub struct RemovedResponse {
    removed: usize,
}

#[derive(Serialize)]
pub struct ArtifactsResponse {
    #[serde(flatten)]
    view: ArtifactsView,
    busy: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct MistakePatch {
    note: Option<String>,
    /// One of "Concept Error", "Calculation", "Misread Question", "Guessing".
    #[schema(value_type = Option<String>)]
    category: Option<MistakeCategory>,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    report: MetricsReport,
    overall_display: String,
    blind_spots: Vec<&'static str>,
}

//=========================================================================================
// Chat Sessions
//=========================================================================================

#[utoipa::path(
    get,
    path = "/sessions",
    responses((status = 200, description = "All chat sessions and the current one"))
)]
pub async fn list_sessions_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = app_state
        .assistant
        .with_state(|s| SessionsResponse {
            current_id: s.sessions.current_id(),
            sessions: s.sessions.list().to_vec(),
        })
        .await;
    Json(response)
}

#[utoipa::path(
    post,
    path = "/sessions",
    responses((status = 201, description = "A new empty session, now current"))
)]
pub async fn create_session_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = app_state
        .assistant
        .with_state(|s| {
            s.create_session();
            s.sessions.current().clone()
        })
        .await;
    info!("Created chat session {}", session.id);
    (StatusCode::CREATED, Json(session))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/select",
    params(("id" = Uuid, Path, description = "The session to make current.")),
    responses(
        (status = 204, description = "Session selected"),
        (status = 404, description = "No such session")
    )
)]
pub async fn select_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .assistant
        .with_state(|s| s.select_session(id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "The session to delete.")),
    responses((status = 204, description = "Session deleted (a fresh one replaces the last)"))
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    app_state.assistant.with_state(|s| s.delete_session(id)).await;
    StatusCode::NO_CONTENT
}

//=========================================================================================
// Sources
//=========================================================================================

#[utoipa::path(
    get,
    path = "/sources",
    responses((status = 200, description = "The source library"))
)]
pub async fn list_sources_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let sources = app_state
        .assistant
        .with_state(|s| s.sources.list().to_vec())
        .await;
    Json(sources)
}

/// Upload one or more documents as sources.
///
/// Accepts a multipart/form-data request with one file per part. Either every
/// file is imported or none is.
#[utoipa::path(
    post,
    path = "/sources/upload",
    request_body(content_type = "multipart/form-data", description = "The documents to upload."),
    responses(
        (status = 201, description = "Sources created"),
        (status = 400, description = "Missing file, unreadable or unsupported file type")
    )
)]
pub async fn upload_sources_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut items = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let file_name = field.file_name().unwrap_or("untitled.txt").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        items.push(
            import_upload(file_name, content_type, data)
                .await
                .map_err(reject)?,
        );
    }
    if items.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ));
    }

    let added = items.clone();
    app_state
        .assistant
        .with_state(move |s| items.into_iter().for_each(|item| s.sources.add(item)))
        .await;
    Ok((StatusCode::CREATED, Json(added)))
}

#[utoipa::path(
    post,
    path = "/sources/link",
    request_body = LinkRequest,
    responses(
        (status = 201, description = "Link source created"),
        (status = 400, description = "Not an http(s) link")
    )
)]
pub async fn add_link_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<LinkRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let item = import_link(&req.url, req.title.as_deref()).map_err(reject)?;
    let added = item.clone();
    app_state.assistant.with_state(move |s| s.sources.add(item)).await;
    Ok((StatusCode::CREATED, Json(added)))
}

#[utoipa::path(
    post,
    path = "/sources/{id}/toggle",
    params(("id" = Uuid, Path, description = "The source to (de)select.")),
    responses(
        (status = 200, description = "New selection state", body = ToggleResponse),
        (status = 404, description = "No such source")
    )
)]
pub async fn toggle_source_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    app_state
        .assistant
        .with_state(|s| s.sources.toggle(id))
        .await
        .map(|is_selected| Json(ToggleResponse { is_selected }))
        .ok_or_else(|| not_found("source", id))
}

#[utoipa::path(
    delete,
    path = "/sources/{id}",
    params(("id" = Uuid, Path, description = "The source to delete.")),
    responses(
        (status = 204, description = "Source deleted"),
        (status = 404, description = "No such source")
    )
)]
pub async fn delete_source_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    if app_state.assistant.with_state(|s| s.sources.delete(id)).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("source", id))
    }
}

#[utoipa::path(
    delete,
    path = "/sources/selected",
    responses((status = 200, description = "Number of removed sources", body = RemovedResponse))
)]
pub async fn delete_selected_sources_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<RemovedResponse> {
    let removed = app_state
        .assistant
        .with_state(|s| s.sources.delete_selected())
        .await;
    Json(RemovedResponse { removed })
}

//=========================================================================================
// Artifacts
//=========================================================================================

/// Send a chat message. Depending on the active tab it edits the artifact on
/// screen or regenerates every artifact.
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Which slots were edited or generated"),
        (status = 400, description = "Empty query")
    )
)]
pub async fn query_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let outcome = app_state
        .assistant
        .submit_query(&req.text, req.active_tab)
        .await
        .map_err(reject)?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/artifacts",
    responses((status = 200, description = "All artifact slots and whether any is loading"))
)]
pub async fn artifacts_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = app_state
        .assistant
        .with_state(|s| ArtifactsResponse {
            view: s.artifacts.view(),
            busy: s.artifacts.is_busy(),
        })
        .await;
    Json(response)
}

#[utoipa::path(
    post,
    path = "/artifacts/{kind}/regenerate",
    params(("kind" = String, Path, description = "explanation, visual, simulation or verification")),
    responses(
        (status = 200, description = "How the regenerated slot settled"),
        (status = 400, description = "Nothing was asked yet")
    )
)]
pub async fn regenerate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(kind): Path<ArtifactKind>,
) -> Result<impl IntoResponse, HandlerError> {
    let outcome = app_state.assistant.regenerate(kind).await.map_err(reject)?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/verify",
    responses(
        (status = 200, description = "How the verification slot settled"),
        (status = 400, description = "Nothing was asked yet")
    )
)]
pub async fn verify_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let outcome = app_state.assistant.verify_latest().await.map_err(reject)?;
    Ok(Json(outcome))
}

//=========================================================================================
// Mistakes and Metrics
//=========================================================================================

#[utoipa::path(
    get,
    path = "/mistakes",
    responses((status = 200, description = "The mistake ledger in insertion order"))
)]
pub async fn list_mistakes_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let mistakes = app_state
        .assistant
        .with_state(|s| s.mistakes.list().to_vec())
        .await;
    Json(mistakes)
}

#[utoipa::path(
    patch,
    path = "/mistakes/{id}",
    params(("id" = Uuid, Path, description = "The mistake to edit.")),
    request_body = MistakePatch,
    responses(
        (status = 204, description = "Mistake updated"),
        (status = 404, description = "No such mistake")
    )
)]
pub async fn update_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MistakePatch>,
) -> Result<StatusCode, HandlerError> {
    let found = app_state
        .assistant
        .with_state(|s| {
            let mut found = s.mistakes.list().iter().any(|m| m.id == id);
            if let Some(note) = patch.note {
                found &= s.mistakes.update(id, note);
            }
            if let Some(category) = patch.category {
                found &= s.mistakes.recategorize(id, category);
            }
            found
        })
        .await;
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("mistake", id))
    }
}

#[utoipa::path(
    delete,
    path = "/mistakes/{id}",
    params(("id" = Uuid, Path, description = "The mistake to delete.")),
    responses((status = 204, description = "Mistake deleted (or already gone)"))
)]
pub async fn delete_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    app_state.assistant.with_state(|s| s.mistakes.delete(id)).await;
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "The derived ten-dimension profile"))
)]
pub async fn metrics_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = app_state.assistant.with_state(|s| s.metrics()).await;
    let overall_display = report.overall_display();
    let blind_spots = report.blind_spots().iter().map(|m| m.label).collect();
    Json(MetricsResponse {
        report,
        overall_display,
        blind_spots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let status = |e| reject(e).0;
        assert_eq!(status(StudyError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StudyError::UnsupportedInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StudyError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(StudyError::InvalidState("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(StudyError::Generation("x".into())), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn openapi_document_lists_the_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/query", "/quiz/submit", "/roleplay/students/{id}/call", "/sources/upload"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
