//! crates/study_assistant_core/src/events.rs
//!
//! Change notifications published by the assistant. The service shell forwards
//! them to connected browsers so the UI can re-render without polling.

use crate::artifacts::SlotStatus;
use crate::domain::ArtifactKind;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudyEvent {
    /// An artifact slot changed state.
    SlotChanged {
        kind: ArtifactKind,
        status: SlotStatus,
    },
    /// A message was appended to a chat session.
    MessageAppended { session_id: Uuid, message_id: Uuid },
    /// The set of students with raised hands changed.
    HandsChanged { raised: Vec<Uuid> },
    /// A student replied and started speaking.
    StudentReplied { agent_id: Uuid, text: String },
}
