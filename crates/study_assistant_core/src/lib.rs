pub mod artifacts;
pub mod assistant;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod mistakes;
pub mod orchestrator;
pub mod ports;
pub mod quiz;
pub mod roleplay;
pub mod sessions;
pub mod sources;
pub mod state;

pub use artifacts::{ArtifactStore, ArtifactsView, SlotState, SlotStatus};
pub use assistant::{AssistantConfig, StudentReply, StudyAssistant};
pub use domain::{
    AgentHandle, Artifact, ArtifactKind, ChatMessage, ChatSession, Difficulty, EditableKind,
    GroundingSource, Metric, MistakeCategory, MistakeItem, Persona, QuestionType, QuizData,
    QuizResult, Role, SourceItem, SourceType, Tab, Verification,
};
pub use error::{StudyError, StudyResult};
pub use events::StudyEvent;
pub use metrics::{derive_metrics, MetricsReport};
pub use orchestrator::{FanOutReport, QueryOutcome, SlotOutcome};
pub use ports::{
    ArtifactGenerationService, ExplanationService, PortError, PortResult,
    QuizGenerationService, RoleplayService, SpeechToTextService, StudyServices,
    TextToSpeechService, VerificationService,
};
pub use state::StudyState;
