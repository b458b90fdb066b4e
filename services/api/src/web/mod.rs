pub mod protocol;
pub mod quiz;
pub mod rest;
pub mod roleplay;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use ws_handler::ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Uploads larger than this are refused before they reach a handler.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Builds every REST and WebSocket route over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    let sessions = Router::new()
        .route(
            "/sessions",
            get(rest::list_sessions_handler).post(rest::create_session_handler),
        )
        .route("/sessions/{id}/select", post(rest::select_session_handler))
        .route("/sessions/{id}", delete(rest::delete_session_handler));

    let sources = Router::new()
        .route("/sources", get(rest::list_sources_handler))
        .route("/sources/upload", post(rest::upload_sources_handler))
        .route("/sources/link", post(rest::add_link_handler))
        .route("/sources/selected", delete(rest::delete_selected_sources_handler))
        .route("/sources/{id}/toggle", post(rest::toggle_source_handler))
        .route("/sources/{id}", delete(rest::delete_source_handler));

    let artifacts = Router::new()
        .route("/query", post(rest::query_handler))
        .route("/artifacts", get(rest::artifacts_handler))
        .route("/artifacts/{kind}/regenerate", post(rest::regenerate_handler))
        .route("/verify", post(rest::verify_handler));

    let quiz = Router::new()
        .route("/quiz", get(quiz::quiz_state_handler))
        .route("/quiz/setup", put(quiz::quiz_setup_handler))
        .route("/quiz/generate", post(quiz::quiz_generate_handler))
        .route("/quiz/type", post(quiz::quiz_type_handler))
        .route("/quiz/answer", post(quiz::quiz_answer_handler))
        .route("/quiz/submit", post(quiz::quiz_submit_handler))
        .route("/quiz/mistake", post(quiz::quiz_mistake_handler))
        .route("/quiz/next", post(quiz::quiz_next_handler))
        .route("/quiz/reset", post(quiz::quiz_reset_handler))
        .route("/quiz/history", get(quiz::quiz_history_handler));

    let progress = Router::new()
        .route("/mistakes", get(rest::list_mistakes_handler))
        .route(
            "/mistakes/{id}",
            delete(rest::delete_mistake_handler).patch(rest::update_mistake_handler),
        )
        .route("/metrics", get(rest::metrics_handler));

    let roleplay = Router::new()
        .route(
            "/roleplay",
            get(roleplay::roleplay_state_handler)
                .post(roleplay::start_roleplay_handler)
                .delete(roleplay::end_roleplay_handler),
        )
        .route("/roleplay/teach", post(roleplay::teach_handler))
        .route("/roleplay/students/{id}/call", post(roleplay::call_on_handler));

    Router::new()
        .merge(sessions)
        .merge(sources)
        .merge(artifacts)
        .merge(quiz)
        .merge(progress)
        .merge(roleplay)
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}
