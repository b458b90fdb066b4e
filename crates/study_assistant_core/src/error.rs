//! crates/study_assistant_core/src/error.rs
//!
//! The error type returned by the core's state machines and operations.

use crate::ports::PortError;
use uuid::Uuid;

/// Everything the core can refuse or fail at.
///
/// AI-service failures inside the artifact fan-out never surface here; they are
/// converted to slot state. `Generation` is only used by operations whose single
/// call has nowhere else to report (quiz generation, roleplay turns).
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Input rejected before any network call (e.g. an empty query).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A file or link type the assistant cannot read.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the current state-machine phase.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(Uuid),

    /// An AI-service call failed and the caller has to be told.
    #[error("Generation failed: {0}")]
    Generation(String),
}

impl From<PortError> for StudyError {
    fn from(e: PortError) -> Self {
        StudyError::Generation(e.to_string())
    }
}

/// A convenience type alias for `Result<T, StudyError>`.
pub type StudyResult<T> = Result<T, StudyError>;
