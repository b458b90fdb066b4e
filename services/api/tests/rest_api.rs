//! Integration tests for the REST surface, run against the real router with
//! in-memory AI services.

use api_lib::web::{self, state::AppState, ws_handler::synthesize_reply};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use study_assistant_core::domain::{
    AgentHandle, Artifact, ChooseQuestion, Difficulty, EditableKind, Persona, QuizData,
    SimulationArtifact, Verification, VisualArtifact,
};
use study_assistant_core::{
    ArtifactGenerationService, AssistantConfig, ExplanationService, PortError, PortResult,
    QuizGenerationService, RoleplayService, StudyAssistant, StudyServices, TextToSpeechService,
    VerificationService,
};
use tower::util::ServiceExt;
use uuid::Uuid;

// ─── Fake AI Service ────────────────────────────────────────────────

struct FakeAi;

#[async_trait]
impl ExplanationService for FakeAi {
    async fn explain(&self, text: &str) -> PortResult<String> {
        Ok(format!("About {}", text))
    }
}

#[async_trait]
impl ArtifactGenerationService for FakeAi {
    async fn generate_artifact(&self, kind: EditableKind, text: &str) -> PortResult<Artifact> {
        Ok(match kind {
            EditableKind::Visual => Artifact::Visual(VisualArtifact {
                mime_type: "image/svg+xml".to_string(),
                data: "<svg/>".to_string(),
                prompt: text.to_string(),
            }),
            EditableKind::Simulation => Artifact::Simulation(SimulationArtifact {
                code: "<html/>".to_string(),
                prompt: text.to_string(),
            }),
        })
    }

    async fn edit_artifact(
        &self,
        _kind: EditableKind,
        current: &Artifact,
        _instruction: &str,
    ) -> PortResult<Artifact> {
        Ok(current.clone())
    }
}

#[async_trait]
impl VerificationService for FakeAi {
    async fn verify(&self, _text: &str) -> PortResult<Verification> {
        Ok(Verification {
            explanation: "Checked.".to_string(),
            sources: vec![],
        })
    }
}

#[async_trait]
impl QuizGenerationService for FakeAi {
    async fn generate_quiz(
        &self,
        _text: &str,
        _difficulty: Difficulty,
        _count: u32,
    ) -> PortResult<QuizData> {
        Ok(QuizData {
            topic: "Capitals".to_string(),
            choose: vec![ChooseQuestion {
                id: "c1".to_string(),
                question: "Capital of France?".to_string(),
                options: vec!["Paris".into(), "Lyon".into()],
                correct_answer: "Paris".to_string(),
                explanation: None,
            }],
            fill_blank: vec![],
            matching: vec![],
            answer: vec![],
        })
    }
}

#[async_trait]
impl RoleplayService for FakeAi {
    async fn create_agent(&self, _topic: &str, persona: Persona) -> PortResult<AgentHandle> {
        Ok(AgentHandle {
            id: Uuid::new_v4(),
            persona,
        })
    }

    async fn send_to_agent(
        &self,
        _agent: &AgentHandle,
        _text: Option<&str>,
        _audio: Option<&[u8]>,
    ) -> PortResult<String> {
        Ok("Why?".to_string())
    }

    async fn remove_agent(&self, _agent: &AgentHandle) -> PortResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TextToSpeechService for FakeAi {
    async fn generate_audio(&self, _text: &str) -> PortResult<Vec<u8>> {
        Ok(vec![0, 1, 2])
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn app_state_with(tts: Arc<dyn TextToSpeechService>) -> Arc<AppState> {
    let ai = Arc::new(FakeAi);
    let services = StudyServices {
        explainer: ai.clone(),
        artifacts: ai.clone(),
        verifier: ai.clone(),
        quizzes: ai.clone(),
        roleplay: ai,
    };
    Arc::new(AppState {
        assistant: Arc::new(StudyAssistant::new(services, AssistantConfig::default())),
        tts_adapter: tts,
    })
}

fn setup_app() -> Router {
    web::router(app_state_with(Arc::new(FakeAi)))
}

/// A voice backend that is always down.
struct BrokenVoice;

#[async_trait]
impl TextToSpeechService for BrokenVoice {
    async fn generate_audio(&self, _text: &str) -> PortResult<Vec<u8>> {
        Err(PortError::Unexpected("voice backend down".to_string()))
    }
}

/// Teaches until at least one student raises a hand.
async fn raise_a_hand(assistant: &StudyAssistant) -> Uuid {
    for _ in 0..200 {
        let raised = assistant
            .teacher_says(Some("Magma rises through the crust.".to_string()), None)
            .await
            .unwrap();
        if let Some(id) = raised.first() {
            return *id;
        }
    }
    panic!("no student ever raised a hand");
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart(file_name: &str, content_type: &str, content: &str) -> Request<Body> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {ct}\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = file_name,
        ct = content_type,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri("/sources/upload")
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap()
}

// ─── Artifacts ──────────────────────────────────────────────────────

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let app = setup_app();
    let (status, _) = call(
        &app,
        "POST",
        "/query",
        Some(json!({"text": "  ", "active_tab": "explanation"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_fills_every_slot() {
    let app = setup_app();
    let (status, body) = call(
        &app,
        "POST",
        "/query",
        Some(json!({"text": "Tides", "active_tab": "explanation"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "generated");

    let (_, artifacts) = call(&app, "GET", "/artifacts", None).await;
    assert_eq!(artifacts["explanation"]["status"], "ready");
    assert_eq!(artifacts["explanation"]["value"], "About Tides");
    assert_eq!(artifacts["verification"]["status"], "ready");
    assert_eq!(artifacts["busy"], false);

    let (_, sessions) = call(&app, "GET", "/sessions", None).await;
    assert_eq!(sessions["sessions"][0]["title"], "Tides");
    assert_eq!(sessions["sessions"][0]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn regenerate_before_any_query_is_a_bad_request() {
    let app = setup_app();
    let (status, _) = call(&app, "POST", "/artifacts/visual/regenerate", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Sessions and Sources ───────────────────────────────────────────

#[tokio::test]
async fn selecting_an_unknown_session_is_not_found() {
    let app = setup_app();
    let uri = format!("/sessions/{}/select", Uuid::new_v4());
    let (status, _) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_uploads_leave_the_library_untouched() {
    let app = setup_app();
    let response = app
        .clone()
        .oneshot(multipart("photo.png", "image/png", "not really a png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, sources) = call(&app, "GET", "/sources", None).await;
    assert!(sources.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn text_uploads_and_links_become_sources() {
    let app = setup_app();
    let response = app
        .clone()
        .oneshot(multipart("notes.txt", "text/plain", "Tides follow the moon."))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (status, link) = call(
        &app,
        "POST",
        "/sources/link",
        Some(json!({"url": "https://youtu.be/xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(link["type"], "youtube");

    let uri = format!("/sources/{}/toggle", link["id"].as_str().unwrap());
    let (_, toggled) = call(&app, "POST", &uri, None).await;
    assert_eq!(toggled["is_selected"], false);

    let (_, removed) = call(&app, "DELETE", "/sources/selected", None).await;
    assert_eq!(removed["removed"], 1);
    let (_, sources) = call(&app, "GET", "/sources", None).await;
    assert_eq!(sources.as_array().unwrap().len(), 1);
    assert_eq!(sources[0]["type"], "youtube");
}

// ─── Quiz ───────────────────────────────────────────────────────────

#[tokio::test]
async fn quiz_round_trip_updates_history_and_metrics() {
    let app = setup_app();

    let (status, _) = call(&app, "POST", "/quiz/submit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "PUT",
        "/quiz/setup",
        Some(json!({"topics": ["Geography"], "difficulty": "Hard", "question_count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, quiz) = call(&app, "POST", "/quiz/generate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quiz["topic"], "Capitals");

    let (status, _) = call(
        &app,
        "POST",
        "/quiz/answer",
        Some(json!({"kind": "choose", "option": "Lyon"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, verdict) = call(&app, "POST", "/quiz/submit", None).await;
    assert_eq!(verdict["correct"], false);

    let (status, mistake) = call(
        &app,
        "POST",
        "/quiz/mistake",
        Some(json!({"category": "Misread Question", "note": "Read too fast"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mistake["correctAnswer"], "Paris");

    let (_, result) = call(&app, "POST", "/quiz/next", None).await;
    assert_eq!(result["score"], 0);
    assert_eq!(result["totalQuestions"], 1);

    let (_, history) = call(&app, "GET", "/quiz/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    let (_, mistakes) = call(&app, "GET", "/mistakes", None).await;
    assert_eq!(mistakes.as_array().unwrap().len(), 1);

    let (status, metrics) = call(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["metrics"].as_array().unwrap().len(), 10);
    assert!(metrics["blind_spots"].as_array().unwrap().contains(&json!("Direct Recall")));
}

#[tokio::test]
async fn an_invalid_quiz_setup_changes_nothing() {
    let app = setup_app();
    let (status, _) = call(
        &app,
        "PUT",
        "/quiz/setup",
        Some(json!({"topics": ["Geography"], "question_count": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, engine) = call(&app, "GET", "/quiz", None).await;
    assert!(engine["settings"]["topics"].as_array().unwrap().is_empty());
}

// ─── Roleplay ───────────────────────────────────────────────────────

#[tokio::test]
async fn roleplay_requires_a_running_classroom() {
    let app = setup_app();
    let (status, _) = call(&app, "GET", "/roleplay", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/roleplay/teach", Some(json!({"text": "Hi"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, classroom) = call(
        &app,
        "POST",
        "/roleplay",
        Some(json!({"topic": "Volcanoes", "personas": ["curious", "argumentative"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(classroom["students"].as_array().unwrap().len(), 2);
    assert_eq!(classroom["students"][0]["name"], "Curious Casey");

    let (status, hands) = call(
        &app,
        "POST",
        "/roleplay/teach",
        Some(json!({"text": "Magma rises through the crust."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(hands["raised"].is_array());
}

#[tokio::test]
async fn ending_a_roleplay_closes_the_classroom() {
    let app = setup_app();
    let (status, _) = call(&app, "DELETE", "/roleplay", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/roleplay",
        Some(json!({"topic": "Volcanoes", "personas": ["curious"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(&app, "DELETE", "/roleplay", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", "/roleplay", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn without_a_listener_a_called_student_is_released_at_once() {
    let app_state = app_state_with(Arc::new(FakeAi));
    let app = web::router(app_state.clone());
    app_state
        .assistant
        .start_roleplay("Volcanoes", &[Persona::Argumentative])
        .await
        .unwrap();
    let student = raise_a_hand(&app_state.assistant).await;

    let uri = format!("/roleplay/students/{}/call", student);
    let (status, reply) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["text"], "Why?");

    let (_, classroom) = call(&app, "GET", "/roleplay", None).await;
    assert_eq!(classroom["students"][0]["isSpeaking"], false);
}

#[tokio::test]
async fn a_failed_voice_releases_the_student() {
    let app_state = app_state_with(Arc::new(BrokenVoice));
    let assistant = app_state.assistant.clone();
    assistant
        .start_roleplay("Volcanoes", &[Persona::Argumentative])
        .await
        .unwrap();
    let student = raise_a_hand(&assistant).await;
    let reply = assistant.call_on(student).await.unwrap();

    assert!(synthesize_reply(&app_state, student, &reply.text).await.is_none());

    let speaking = assistant
        .with_state(|s| s.classroom.as_ref().unwrap().students[0].is_speaking)
        .await;
    assert!(!speaking);
    raise_a_hand(&assistant).await;
}
