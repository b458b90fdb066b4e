pub mod artifact_llm;
pub(crate) mod chat;
pub mod explain_llm;
pub mod quiz_llm;
pub mod roleplay_llm;
pub mod sst;
pub mod tts;
pub mod verify_llm;

pub use artifact_llm::OpenAiArtifactAdapter;
pub use explain_llm::OpenAiExplanationAdapter;
pub use quiz_llm::OpenAiQuizAdapter;
pub use roleplay_llm::OpenAiRoleplayAdapter;
pub use sst::OpenAiSstAdapter;
pub use tts::OpenAiTtsAdapter;
pub use verify_llm::OpenAiVerificationAdapter;
