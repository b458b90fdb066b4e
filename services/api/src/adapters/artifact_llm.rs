//! services/api/src/adapters/artifact_llm.rs
//!
//! The adapter that produces and edits the renderable artifacts: an SVG
//! infographic for the visual slot and a self-contained HTML page for the
//! simulation slot. It implements the `ArtifactGenerationService` port.

use crate::adapters::chat;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use study_assistant_core::domain::{Artifact, EditableKind, SimulationArtifact, VisualArtifact};
use study_assistant_core::ports::{ArtifactGenerationService, PortError, PortResult};
use tracing::debug;

const SVG_MIME_TYPE: &str = "image/svg+xml";

const VISUAL_INSTRUCTIONS: &str = r#"You design educational infographics.

Produce ONE self-contained SVG document that explains the student's topic at a
glance: a title, labelled shapes or arrows for the key parts, and short captions.
Use a viewBox, readable font sizes and no external resources or scripts.

Respond with the SVG markup only, starting with <svg and ending with </svg>."#;

const SIMULATION_INSTRUCTIONS: &str = r#"You build small interactive simulations for students.

Produce ONE self-contained HTML document (inline CSS and JavaScript, no external
resources) that lets the student explore the topic: sliders, buttons or a canvas
animation that shows how changing an input changes the outcome. Include a short
explanation of what to try.

Respond with the HTML only, starting with <!DOCTYPE html>."#;

const EDIT_INSTRUCTIONS: &str = r#"You revise an existing educational artifact.

You receive the CURRENT ARTIFACT and an INSTRUCTION from the student. Apply the
instruction and keep everything else as it was. Respond with the complete
revised document only, in the same format as the current artifact."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OpenAiArtifactAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiArtifactAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    async fn render(&self, system: &str, kind: EditableKind, user: String) -> PortResult<String> {
        let raw = chat::ask(&self.client, &self.model, system, user, 6000).await?;
        let body = chat::strip_code_fence(&raw)?;
        match kind {
            EditableKind::Visual => extract_svg(&body),
            EditableKind::Simulation => Ok(body),
        }
    }
}

/// Cuts the `<svg>...</svg>` element out of the model's answer.
fn extract_svg(text: &str) -> PortResult<String> {
    let start = text.find("<svg");
    let end = text.rfind("</svg>");
    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok(text[start..end + "</svg>".len()].to_string()),
        _ => Err(PortError::Unexpected(
            "The model did not return an SVG document".to_string(),
        )),
    }
}

//=========================================================================================
// `ArtifactGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ArtifactGenerationService for OpenAiArtifactAdapter {
    async fn generate_artifact(&self, kind: EditableKind, text: &str) -> PortResult<Artifact> {
        debug!("Generating a {:?} artifact", kind);
        match kind {
            EditableKind::Visual => {
                let data = self.render(VISUAL_INSTRUCTIONS, kind, text.to_string()).await?;
                Ok(Artifact::Visual(VisualArtifact {
                    mime_type: SVG_MIME_TYPE.to_string(),
                    data,
                    prompt: text.to_string(),
                }))
            }
            EditableKind::Simulation => {
                let code = self
                    .render(SIMULATION_INSTRUCTIONS, kind, text.to_string())
                    .await?;
                Ok(Artifact::Simulation(SimulationArtifact {
                    code,
                    prompt: text.to_string(),
                }))
            }
        }
    }

    async fn edit_artifact(
        &self,
        kind: EditableKind,
        current: &Artifact,
        instruction: &str,
    ) -> PortResult<Artifact> {
        let user = |document: &str| {
            format!(
                "CURRENT ARTIFACT:\n{}\n\nINSTRUCTION:\n{}",
                document, instruction
            )
        };
        match (kind, current) {
            (EditableKind::Visual, Artifact::Visual(visual)) => {
                let data = self.render(EDIT_INSTRUCTIONS, kind, user(&visual.data)).await?;
                Ok(Artifact::Visual(VisualArtifact {
                    data,
                    ..visual.clone()
                }))
            }
            (EditableKind::Simulation, Artifact::Simulation(simulation)) => {
                let code = self
                    .render(EDIT_INSTRUCTIONS, kind, user(&simulation.code))
                    .await?;
                Ok(Artifact::Simulation(SimulationArtifact {
                    code,
                    ..simulation.clone()
                }))
            }
            (kind, current) => Err(PortError::Unexpected(format!(
                "Cannot edit a {:?} artifact as {:?}",
                current.kind(),
                kind
            ))),
        }
    }
}
