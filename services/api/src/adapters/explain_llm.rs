//! services/api/src/adapters/explain_llm.rs
//!
//! The adapter behind the explanation slot. It implements the
//! `ExplanationService` port from the `core` crate.

use crate::adapters::chat;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use study_assistant_core::ports::{ExplanationService, PortResult};
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = r#"You are a patient tutor helping a student understand a topic.

The input is the student's question or topic. It may be followed by a
"REFERENCE MATERIAL:" section with excerpts from the student's own sources.

Write a clear explanation in Markdown:
- Start with a one-paragraph overview in plain words.
- Break the idea into its key parts with short headings or a list.
- Give one concrete example or analogy.
- End with a two or three bullet recap.

Prefer the reference material when it covers the question, and say so when it
contradicts general knowledge. Do not invent citations."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OpenAiExplanationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiExplanationAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ExplanationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExplanationService for OpenAiExplanationAdapter {
    async fn explain(&self, text: &str) -> PortResult<String> {
        debug!("Requesting an explanation ({} chars of input)", text.len());
        chat::ask(&self.client, &self.model, SYSTEM_INSTRUCTIONS, text, 2000).await
    }
}
