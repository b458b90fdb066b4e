//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the AI vendor that actually generates content.

use crate::domain::{
    AgentHandle, Artifact, Difficulty, EditableKind, Persona, QuizData, Verification,
};
use async_trait::async_trait;
use std::sync::Arc;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services. Callers in the
/// core never branch on the variant: any failure is a "service error".
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ExplanationService: Send + Sync {
    /// Writes a study explanation of the given text.
    async fn explain(&self, text: &str) -> PortResult<String>;
}

#[async_trait]
pub trait ArtifactGenerationService: Send + Sync {
    /// Produces a fresh visual or simulation for the given text.
    async fn generate_artifact(&self, kind: EditableKind, text: &str) -> PortResult<Artifact>;

    /// Produces a revised artifact by applying a chat instruction to `current`.
    async fn edit_artifact(
        &self,
        kind: EditableKind,
        current: &Artifact,
        instruction: &str,
    ) -> PortResult<Artifact>;
}

#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Fact-checks the text against grounded web sources.
    async fn verify(&self, text: &str) -> PortResult<Verification>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Generates a structured quiz of roughly `count` questions per section.
    async fn generate_quiz(
        &self,
        text: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> PortResult<QuizData>;
}

#[async_trait]
pub trait RoleplayService: Send + Sync {
    /// Creates a new simulated student with its own private chat history.
    async fn create_agent(&self, topic: &str, persona: Persona) -> PortResult<AgentHandle>;

    /// Sends a teacher utterance (text, audio or both) and returns the student's reply.
    async fn send_to_agent(
        &self,
        agent: &AgentHandle,
        text: Option<&str>,
        audio: Option<&[u8]>,
    ) -> PortResult<String>;

    /// Drops a student and its history. Unknown agents are not an error.
    async fn remove_agent(&self, agent: &AgentHandle) -> PortResult<()>;
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes a slice of audio data into text.
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}

/// The set of AI collaborators the core consumes, wired once at startup.
#[derive(Clone)]
pub struct StudyServices {
    pub explainer: Arc<dyn ExplanationService>,
    pub artifacts: Arc<dyn ArtifactGenerationService>,
    pub verifier: Arc<dyn VerificationService>,
    pub quizzes: Arc<dyn QuizGenerationService>,
    pub roleplay: Arc<dyn RoleplayService>,
}
