//! services/api/src/adapters/chat.rs
//!
//! Shared plumbing for the adapters that talk to the chat-completions endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use regex::Regex;
use study_assistant_core::ports::{PortError, PortResult};

pub(crate) fn system_message(content: impl Into<String>) -> PortResult<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(content.into())
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .into())
}

pub(crate) fn user_message(content: impl Into<String>) -> PortResult<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content.into())
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .into())
}

pub(crate) fn assistant_message(
    content: impl Into<String>,
) -> PortResult<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestAssistantMessageArgs::default()
        .content(content.into())
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .into())
}

/// Sends a conversation and returns the first choice's text.
pub(crate) async fn complete(
    client: &Client<OpenAIConfig>,
    model: &str,
    messages: Vec<ChatCompletionRequestMessage>,
    max_tokens: u32,
) -> PortResult<String> {
    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .max_completion_tokens(max_tokens)
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .ok_or_else(|| PortError::Unexpected("The model returned no content".to_string()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(PortError::Unexpected("The model returned an empty answer".to_string()));
    }
    Ok(text.to_string())
}

/// A system prompt plus a single user turn.
pub(crate) async fn ask(
    client: &Client<OpenAIConfig>,
    model: &str,
    system: &str,
    user: impl Into<String>,
    max_tokens: u32,
) -> PortResult<String> {
    let messages = vec![system_message(system)?, user_message(user)?];
    complete(client, model, messages, max_tokens).await
}

/// Removes a surrounding markdown code fence (```lang ... ```) if the model added one.
pub(crate) fn strip_code_fence(text: &str) -> PortResult<String> {
    let fence = Regex::new(r"(?s)^\s*```[A-Za-z0-9_+-]*\s*\n(.*?)\n?```\s*$")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(match fence.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    })
}
