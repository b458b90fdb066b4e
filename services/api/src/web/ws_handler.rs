//! services/api/src/web/ws_handler.rs
//!
//! The WebSocket surface. Every connection gets a forwarding task that pushes
//! study events to the browser (with synthesized audio for student replies),
//! while the receive loop handles spoken teacher turns and playback signals.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, AudioPush, ConnectionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::collections::HashSet;
use std::sync::Arc;
use study_assistant_core::StudyEvent;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;
type Playing = Arc<Mutex<HashSet<Uuid>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let mut connection = ConnectionState::new();

    if !send_message(&ws_sender, &ServerMessage::Connected).await {
        return;
    }

    // --- 1. Event Forwarding ---
    let forward_task = {
        let app_state = app_state.clone();
        let ws_sender = ws_sender.clone();
        let token = connection.cancellation_token.clone();
        let playing = connection.playing.clone();
        let events = app_state.assistant.subscribe();
        tokio::spawn(async move {
            forward_events(app_state, ws_sender, playing, events, token).await
        })
    };

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                handle_text_message(text.as_str(), &app_state, &mut connection, &ws_sender).await;
            }
            Message::Binary(data) => match connection.push_audio(&data) {
                AudioPush::Buffered => {}
                AudioPush::Ignored => {
                    warn!("Ignoring {} audio bytes outside a teaching turn.", data.len());
                }
                AudioPush::Overflow => {
                    warn!("Teaching turn exceeded the audio limit and was dropped.");
                    let message = ServerMessage::Error {
                        message: "That was too long to transcribe. Please speak in shorter turns."
                            .to_string(),
                    };
                    if !send_message(&ws_sender, &message).await {
                        break;
                    }
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    connection.cancellation_token.cancel();
    if let Err(e) = forward_task.await {
        error!("Event forwarding task failed: {}", e);
    }
    let interrupted: Vec<Uuid> = connection.playing.lock().await.drain().collect();
    for agent_id in interrupted {
        release_student(&app_state, agent_id).await;
    }
    info!("WebSocket connection closed.");
}

/// Pushes every study event to the client until the connection ends.
async fn forward_events(
    app_state: Arc<AppState>,
    ws_sender: WsSender,
    playing: Playing,
    mut events: broadcast::Receiver<StudyEvent>,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            received = events.recv() => received,
        };
        match event {
            Ok(event) => {
                let reply = match &event {
                    StudyEvent::StudentReplied { agent_id, text } => Some((*agent_id, text.clone())),
                    _ => None,
                };
                if !send_message(&ws_sender, &ServerMessage::Event { event }).await {
                    break;
                }
                if let Some((agent_id, text)) = reply {
                    if !send_student_speech(&app_state, &ws_sender, &playing, agent_id, &text).await
                    {
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("WebSocket client lagged behind; {} events skipped.", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Sends a student's synthesized reply as a binary frame and marks it as playing.
/// Without audio to play, the student is released at once.
async fn send_student_speech(
    app_state: &AppState,
    ws_sender: &WsSender,
    playing: &Playing,
    agent_id: Uuid,
    text: &str,
) -> bool {
    let Some(audio) = synthesize_reply(app_state, agent_id, text).await else {
        return send_message(
            ws_sender,
            &ServerMessage::Error {
                message: "The student's voice could not be generated.".to_string(),
            },
        )
        .await;
    };

    playing.lock().await.insert(agent_id);
    let sent = send_message(ws_sender, &ServerMessage::StudentSpeech { agent_id }).await
        && ws_sender
            .lock()
            .await
            .send(Message::Binary(Bytes::from(audio)))
            .await
            .is_ok();
    if !sent {
        playing.lock().await.remove(&agent_id);
        release_student(app_state, agent_id).await;
    }
    sent
}

/// Synthesizes a student's reply. On failure there is no playback to wait for,
/// so the student stops speaking right away.
pub async fn synthesize_reply(
    app_state: &AppState,
    agent_id: Uuid,
    text: &str,
) -> Option<Vec<u8>> {
    match app_state.tts_adapter.generate_audio(text).await {
        Ok(audio) => Some(audio),
        Err(e) => {
            error!("Failed to synthesize the reply of student {}: {}", agent_id, e);
            release_student(app_state, agent_id).await;
            None
        }
    }
}

pub(crate) async fn release_student(app_state: &AppState, agent_id: Uuid) {
    if let Err(e) = app_state.assistant.speech_finished(agent_id).await {
        warn!("Could not release student {}: {}", agent_id, e);
    }
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    connection: &mut ConnectionState,
    ws_sender: &WsSender,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return;
        }
    };

    let result = match client_msg {
        ClientMessage::TeachingStarted => {
            info!("Teacher started speaking.");
            connection.start_teaching();
            Ok(())
        }
        ClientMessage::TeachingEnded => {
            let audio = connection.finish_teaching();
            info!("Teacher stopped speaking ({} bytes of audio).", audio.len());
            app_state
                .assistant
                .teacher_says(None, Some(audio))
                .await
                .map(|_| ())
        }
        ClientMessage::SpeechFinished { agent_id } => {
            connection.playing.lock().await.remove(&agent_id);
            app_state.assistant.speech_finished(agent_id).await
        }
    };

    if let Err(e) = result {
        warn!("Client message rejected: {}", e);
        send_message(
            ws_sender,
            &ServerMessage::Error {
                message: e.to_string(),
            },
        )
        .await;
    }
}

/// Serializes and sends one text frame. Returns false once the client is gone.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}
