//! services/api/src/adapters/verify_llm.rs
//!
//! The fact-checking adapter. It asks a web-search enabled model to check the
//! student's query and turns the markdown citations in its answer into
//! grounding sources. It implements the `VerificationService` port.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::responses::{CreateResponseArgs, Tool, WebSearchTool},
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use study_assistant_core::domain::{GroundingSource, Verification};
use study_assistant_core::ports::{PortError, PortResult, VerificationService};
use tracing::{debug, warn};

const SYSTEM_INSTRUCTIONS: &str = r#"You are a careful fact-checker for students.

The input is a question or statement the student is studying, optionally followed
by their REFERENCE MATERIAL. Use the web search tool to check the key claims.

Write a short verdict in Markdown:
- Say whether the information is accurate, partly accurate or inaccurate.
- Correct anything that is wrong or outdated.
- Cite every checked claim with a markdown link to the page you used, like
  ([Site name](https://example.org/page)).

Keep it under 200 words."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OpenAiVerificationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVerificationAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Splits a cited answer into readable prose and the list of linked sources.
/// Sources keep their first-seen order and are unique by uri.
fn split_citations(text: &str) -> PortResult<Verification> {
    let link = Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let wrapped = Regex::new(r"\s*\(\[[^\]]*\]\([^)]*\)\)")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let mut seen = HashSet::new();
    let sources = link
        .captures_iter(text)
        .filter(|caps| seen.insert(caps[2].to_string()))
        .map(|caps| GroundingSource {
            uri: caps[2].to_string(),
            title: caps[1].trim().to_string(),
        })
        .collect();

    let explanation = wrapped.replace_all(text, "");
    let explanation = link.replace_all(&explanation, "$1");
    Ok(Verification {
        explanation: explanation.trim().to_string(),
        sources,
    })
}

//=========================================================================================
// `VerificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl VerificationService for OpenAiVerificationAdapter {
    async fn verify(&self, text: &str) -> PortResult<Verification> {
        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(SYSTEM_INSTRUCTIONS)
            .input(text.to_string())
            .tools(vec![Tool::WebSearch(WebSearchTool::default())])
            .max_output_tokens(1200u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw = response.output_text().unwrap_or_default();
        if raw.trim().is_empty() {
            return Err(PortError::Unexpected(
                "The fact-check returned no text".to_string(),
            ));
        }

        let verification = split_citations(&raw)?;
        if verification.sources.is_empty() {
            warn!("Fact-check answer carried no citations");
        }
        debug!("Fact-check cited {} sources", verification.sources.len());
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citations_become_sources_and_leave_the_prose() {
        let answer = "Mostly accurate. Water boils at 100 °C at sea level ([NIST](https://nist.gov/water)). \
                      See also [Britannica](https://britannica.com/boiling) and again \
                      ([NIST](https://nist.gov/water)).";
        let v = split_citations(answer).unwrap();

        assert_eq!(
            v.sources,
            vec![
                GroundingSource {
                    uri: "https://nist.gov/water".to_string(),
                    title: "NIST".to_string(),
                },
                GroundingSource {
                    uri: "https://britannica.com/boiling".to_string(),
                    title: "Britannica".to_string(),
                },
            ]
        );
        assert!(!v.explanation.contains("https://"));
        assert!(v.explanation.contains("See also Britannica"));
    }
}
