//! services/api/src/adapters/roleplay_llm.rs
//!
//! The simulated students of the teach-back classroom. Every agent is a chat
//! conversation with its own persona prompt and private history, kept here and
//! addressed by the `AgentHandle` id. Spoken teacher turns are transcribed with
//! the speech-to-text port first.
//!
//! It implements the `RoleplayService` port from the `core` crate.

use crate::adapters::chat;
use async_openai::{config::OpenAIConfig, types::chat::ChatCompletionRequestMessage, Client};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use study_assistant_core::domain::{AgentHandle, Persona};
use study_assistant_core::ports::{PortError, PortResult, RoleplayService, SpeechToTextService};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const PERSONA_TEMPLATE: &str = r#"You are {name}, {description}.

A fellow learner is teaching you about "{topic}". They play the teacher; you are
one of several students in the room.

Stay in character:
- React to what the teacher just said, not to things they have not covered.
- Ask one question or make one remark per turn, in one to three spoken sentences.
- Never teach the topic yourself and never mention that you are an AI."#;

struct AgentConversation {
    history: Vec<ChatCompletionRequestMessage>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct OpenAiRoleplayAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    sst: Arc<dyn SpeechToTextService>,
    agents: Mutex<HashMap<Uuid, AgentConversation>>,
}

impl OpenAiRoleplayAdapter {
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        sst: Arc<dyn SpeechToTextService>,
    ) -> Self {
        Self {
            client,
            model,
            sst,
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// The teacher's turn as text: typed text, transcribed audio, or both.
    async fn teacher_turn(&self, text: Option<&str>, audio: Option<&[u8]>) -> PortResult<String> {
        let mut parts = Vec::new();
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(text.to_string());
        }
        if let Some(audio) = audio.filter(|a| !a.is_empty()) {
            let transcript = self.sst.transcribe_audio(audio).await?;
            debug!("Transcribed teacher audio: {}", transcript);
            parts.push(transcript);
        }
        if parts.is_empty() {
            return Err(PortError::Unexpected(
                "The teacher turn carried neither text nor audio".to_string(),
            ));
        }
        Ok(parts.join(" "))
    }
}

fn persona_prompt(topic: &str, persona: Persona) -> String {
    PERSONA_TEMPLATE
        .replace("{name}", persona.display_name())
        .replace("{description}", persona.description())
        .replace("{topic}", topic)
}

//=========================================================================================
// `RoleplayService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RoleplayService for OpenAiRoleplayAdapter {
    async fn create_agent(&self, topic: &str, persona: Persona) -> PortResult<AgentHandle> {
        let handle = AgentHandle {
            id: Uuid::new_v4(),
            persona,
        };
        let conversation = AgentConversation {
            history: vec![chat::system_message(persona_prompt(topic, persona))?],
        };
        self.agents.lock().await.insert(handle.id, conversation);
        info!("Created roleplay agent {} ({})", handle.id, persona.display_name());
        Ok(handle)
    }

    async fn send_to_agent(
        &self,
        agent: &AgentHandle,
        text: Option<&str>,
        audio: Option<&[u8]>,
    ) -> PortResult<String> {
        let teacher = self.teacher_turn(text, audio).await?;

        let mut messages = {
            let agents = self.agents.lock().await;
            agents
                .get(&agent.id)
                .map(|c| c.history.clone())
                .ok_or_else(|| PortError::NotFound(format!("roleplay agent {}", agent.id)))?
        };
        let user = chat::user_message(format!("Teacher: {}", teacher))?;
        messages.push(user.clone());

        let reply = chat::complete(&self.client, &self.model, messages, 300).await?;

        let mut agents = self.agents.lock().await;
        if let Some(conversation) = agents.get_mut(&agent.id) {
            conversation.history.push(user);
            conversation.history.push(chat::assistant_message(reply.clone())?);
        }
        Ok(reply)
    }

    async fn remove_agent(&self, agent: &AgentHandle) -> PortResult<()> {
        if self.agents.lock().await.remove(&agent.id).is_some() {
            debug!("Removed roleplay agent {}", agent.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentSst;

    #[async_trait]
    impl SpeechToTextService for SilentSst {
        async fn transcribe_audio(&self, _audio_data: &[u8]) -> PortResult<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn removed_agents_lose_their_history() {
        let adapter = OpenAiRoleplayAdapter::new(
            Client::with_config(OpenAIConfig::new()),
            "test-model".to_string(),
            Arc::new(SilentSst),
        );
        let kept = adapter.create_agent("Tides", Persona::Curious).await.unwrap();
        let dropped = adapter.create_agent("Tides", Persona::Confused).await.unwrap();

        adapter.remove_agent(&dropped).await.unwrap();
        adapter.remove_agent(&dropped).await.unwrap();

        let agents = adapter.agents.lock().await;
        assert!(agents.contains_key(&kept.id));
        assert!(!agents.contains_key(&dropped.id));
    }

    #[test]
    fn persona_prompt_names_the_student_and_topic() {
        let prompt = persona_prompt("Fractions", Persona::Skeptical);
        assert!(prompt.starts_with("You are Skeptical Sam, a student who doubts claims"));
        assert!(prompt.contains("\"Fractions\""));
    }
}
