//! crates/study_assistant_core/src/assistant.rs
//!
//! `StudyAssistant` owns the shared [`StudyState`] and the AI services, and runs
//! every operation that has to call out to a service: quiz generation, the
//! roleplay turns and (in `orchestrator.rs`) the artifact fan-out.
//!
//! Calls are made with the state lock released; results are applied under a
//! fresh lock and checked for staleness first.

use crate::domain::{AgentHandle, Persona, QuizData};
use crate::error::{StudyError, StudyResult};
use crate::events::StudyEvent;
use crate::ports::StudyServices;
use crate::roleplay::{Classroom, TeacherUtterance};
use crate::state::StudyState;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Whether verification joins the fan-out for every new query. When off,
    /// verification only runs on an explicit `verify_latest`.
    pub auto_verify_on_query: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            auto_verify_on_query: true,
        }
    }
}

/// A student's answer after being called on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReply {
    pub agent_id: Uuid,
    pub name: String,
    pub text: String,
}

pub struct StudyAssistant {
    pub(crate) services: StudyServices,
    pub(crate) config: AssistantConfig,
    pub(crate) state: Arc<Mutex<StudyState>>,
    events: broadcast::Sender<StudyEvent>,
}

impl StudyAssistant {
    pub fn new(services: StudyServices, config: AssistantConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            services,
            config,
            state: Arc::new(Mutex::new(StudyState::new())),
            events,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Runs a synchronous transition (or read) against the state.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut StudyState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudyEvent> {
        self.events.subscribe()
    }

    /// How many subscribers currently receive events.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub(crate) fn publish(&self, event: StudyEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    //=====================================================================================
    // Quiz
    //=====================================================================================

    /// Requests a quiz for the configured settings and makes it active.
    pub async fn generate_quiz(&self) -> StudyResult<QuizData> {
        let request = {
            let mut state = self.state.lock().await;
            let context = state.quiz_context();
            state.quiz.begin_generation(&context)?
        };
        info!(
            "Generating {} quiz with {} questions",
            request.difficulty, request.count
        );

        let result = self
            .services
            .quizzes
            .generate_quiz(&request.text, request.difficulty, request.count)
            .await;

        let mut state = self.state.lock().await;
        if !state.quiz.finish_generation(request.ticket, result)? {
            warn!("Discarding a quiz that arrived after the learner moved on.");
            return Err(StudyError::InvalidState(
                "the quiz request was superseded".to_string(),
            ));
        }
        state
            .quiz
            .quiz()
            .cloned()
            .ok_or_else(|| StudyError::InvalidState("no active quiz".to_string()))
    }

    //=====================================================================================
    // Roleplay
    //=====================================================================================

    /// Opens a classroom with one simulated student per persona. Replaces any
    /// previous classroom only once every agent was created.
    pub async fn start_roleplay(&self, topic: &str, personas: &[Persona]) -> StudyResult<Classroom> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StudyError::Validation("a roleplay needs a topic".to_string()));
        }
        if personas.is_empty() {
            return Err(StudyError::Validation(
                "a roleplay needs at least one student".to_string(),
            ));
        }

        let created = join_all(
            personas
                .iter()
                .map(|persona| self.services.roleplay.create_agent(topic, *persona)),
        )
        .await;
        let mut handles = Vec::with_capacity(created.len());
        let mut failure = None;
        for result in created {
            match result {
                Ok(handle) => handles.push(handle),
                Err(e) => failure = failure.or(Some(e)),
            }
        }
        if let Some(e) = failure {
            error!("Failed to create roleplay students: {}", e);
            self.release_agents(&handles).await;
            return Err(StudyError::Generation(
                "Failed to start the roleplay. Please try again.".to_string(),
            ));
        }

        let classroom = Classroom::new(topic, handles);
        info!(
            "Roleplay on '{}' started with {} students",
            topic,
            classroom.students.len()
        );
        let replaced = self
            .state
            .lock()
            .await
            .classroom
            .replace(classroom.clone());
        if let Some(old) = replaced {
            let handles: Vec<AgentHandle> =
                old.students.into_iter().map(|s| s.handle).collect();
            self.release_agents(&handles).await;
        }
        Ok(classroom)
    }

    /// Ends the running roleplay and releases its students.
    pub async fn end_roleplay(&self) -> StudyResult<()> {
        let classroom = self
            .state
            .lock()
            .await
            .classroom
            .take()
            .ok_or_else(no_classroom)?;
        info!("Roleplay on '{}' ended", classroom.topic);
        let handles: Vec<AgentHandle> = classroom.students.into_iter().map(|s| s.handle).collect();
        self.release_agents(&handles).await;
        Ok(())
    }

    async fn release_agents(&self, handles: &[AgentHandle]) {
        let results = join_all(
            handles
                .iter()
                .map(|handle| self.services.roleplay.remove_agent(handle)),
        )
        .await;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to release student {}: {}", handle.id, e);
            }
        }
    }

    /// Records a teacher utterance and returns the ids of students raising a hand.
    pub async fn teacher_says(
        &self,
        text: Option<String>,
        audio: Option<Vec<u8>>,
    ) -> StudyResult<Vec<Uuid>> {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let audio = audio.filter(|a| !a.is_empty());
        if text.is_none() && audio.is_none() {
            return Err(StudyError::Validation(
                "say something before the students can react".to_string(),
            ));
        }

        let raised = {
            let mut state = self.state.lock().await;
            let classroom = state.classroom.as_mut().ok_or_else(no_classroom)?;
            let mut rng = StdRng::from_entropy();
            classroom.teacher_says(TeacherUtterance { text, audio }, &mut rng);
            classroom
                .students
                .iter()
                .filter(|s| s.is_hand_raised)
                .map(|s| s.id)
                .collect::<Vec<_>>()
        };
        self.publish(StudyEvent::HandsChanged {
            raised: raised.clone(),
        });
        Ok(raised)
    }

    /// Calls on a student with a raised hand and returns the reply.
    pub async fn call_on(&self, agent_id: Uuid) -> StudyResult<StudentReply> {
        let turn = {
            let mut state = self.state.lock().await;
            let classroom = state.classroom.as_mut().ok_or_else(no_classroom)?;
            classroom.call_on(agent_id)?
        };
        self.publish(StudyEvent::HandsChanged { raised: Vec::new() });

        let result = self
            .services
            .roleplay
            .send_to_agent(
                &turn.handle,
                turn.utterance.text.as_deref(),
                turn.utterance.audio.as_deref(),
            )
            .await;

        let mut state = self.state.lock().await;
        let classroom = match state.classroom.as_mut() {
            Some(c) if c.student(agent_id).is_some() => c,
            _ => {
                warn!("Discarding a reply from student {} of a closed classroom.", agent_id);
                return Err(no_classroom());
            }
        };

        match result {
            Ok(text) => {
                classroom.record_reply(agent_id, text.clone())?;
                let name = classroom
                    .student(agent_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                drop(state);
                self.publish(StudyEvent::StudentReplied {
                    agent_id,
                    text: text.clone(),
                });
                Ok(StudentReply {
                    agent_id,
                    name,
                    text,
                })
            }
            Err(e) => {
                error!("Student {} failed to reply: {}", agent_id, e);
                classroom.speech_finished(agent_id);
                Err(StudyError::Generation(
                    "The student could not answer. Please try again.".to_string(),
                ))
            }
        }
    }

    /// Marks the end of a student's speech playback.
    pub async fn speech_finished(&self, agent_id: Uuid) -> StudyResult<()> {
        let mut state = self.state.lock().await;
        let classroom = state.classroom.as_mut().ok_or_else(no_classroom)?;
        if classroom.speech_finished(agent_id) {
            Ok(())
        } else {
            Err(StudyError::NotFound(format!("student {}", agent_id)))
        }
    }
}

fn no_classroom() -> StudyError {
    StudyError::InvalidState("no roleplay is running".to_string())
}
