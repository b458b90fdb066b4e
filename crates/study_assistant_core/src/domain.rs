//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! They derive serde so the service shell can put them on the wire unchanged,
//! but nothing here knows about HTTP, storage or a particular AI vendor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Chat Sessions
//=========================================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// A file reference attached to a chat message (the bytes live elsewhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// One conversation. Messages are append-only and kept in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Reference Sources
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Youtube,
    Pdf,
    Website,
    Image,
}

/// A reference document. Only selected sources are fed to the AI as context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub metadata: String,
    pub is_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

//=========================================================================================
// Generated Artifacts
//=========================================================================================

/// The four artifact slots produced for a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Explanation,
    Visual,
    Simulation,
    Verification,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Explanation,
        ArtifactKind::Visual,
        ArtifactKind::Simulation,
        ArtifactKind::Verification,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Explanation => "explanation",
            ArtifactKind::Visual => "visual",
            ArtifactKind::Simulation => "simulation",
            ArtifactKind::Verification => "verification",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The artifact kinds that can be generated as a renderable payload and edited by chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableKind {
    Visual,
    Simulation,
}

impl From<EditableKind> for ArtifactKind {
    fn from(kind: EditableKind) -> Self {
        match kind {
            EditableKind::Visual => ArtifactKind::Visual,
            EditableKind::Simulation => ArtifactKind::Simulation,
        }
    }
}

/// An infographic. `data` is inline markup (SVG) or base64, as told by `mime_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualArtifact {
    pub mime_type: String,
    pub data: String,
    /// The request the visual was drawn from; edits build on it.
    pub prompt: String,
}

/// A self-contained, renderable interactive simulation (HTML + JS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationArtifact {
    pub code: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Visual(VisualArtifact),
    Simulation(SimulationArtifact),
}

impl Artifact {
    pub fn kind(&self) -> EditableKind {
        match self {
            Artifact::Visual(_) => EditableKind::Visual,
            Artifact::Simulation(_) => EditableKind::Simulation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// A fact-check of the query with the web sources it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub explanation: String,
    pub sources: Vec<GroundingSource>,
}

/// The tab the learner is looking at when sending a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Explanation,
    Visual,
    Simulation,
    Verification,
    Quiz,
    Metrics,
    Roleplay,
}

impl Tab {
    /// The editable artifact shown on this tab, if any.
    pub fn editable_kind(self) -> Option<EditableKind> {
        match self {
            Tab::Visual => Some(EditableKind::Visual),
            Tab::Simulation => Some(EditableKind::Simulation),
            _ => None,
        }
    }
}

//=========================================================================================
// Quizzes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(s)
    }
}

/// The four quiz sections, in the order they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    Choose,
    FillBlank,
    Match,
    Answer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Choose,
        QuestionType::FillBlank,
        QuestionType::Match,
        QuestionType::Answer,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillBlankQuestion {
    pub id: String,
    pub question: String,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuestion {
    pub id: String,
    pub question: String,
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestion {
    pub id: String,
    pub question: String,
    /// Shown for self-assessment only; never graded against.
    pub sample_answer: String,
}

/// A generated quiz. Replaced wholesale by the next generation, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    pub topic: String,
    #[serde(default)]
    pub choose: Vec<ChooseQuestion>,
    #[serde(default)]
    pub fill_blank: Vec<FillBlankQuestion>,
    #[serde(default, rename = "match")]
    pub matching: Vec<MatchQuestion>,
    #[serde(default)]
    pub answer: Vec<AnswerQuestion>,
}

impl QuizData {
    pub fn section_len(&self, kind: QuestionType) -> usize {
        match kind {
            QuestionType::Choose => self.choose.len(),
            QuestionType::FillBlank => self.fill_blank.len(),
            QuestionType::Match => self.matching.len(),
            QuestionType::Answer => self.answer.len(),
        }
    }

    pub fn total_questions(&self) -> usize {
        QuestionType::ALL.iter().map(|k| self.section_len(*k)).sum()
    }

    /// The first section with at least one question, in presentation order.
    pub fn first_section(&self) -> Option<QuestionType> {
        QuestionType::ALL
            .into_iter()
            .find(|k| self.section_len(*k) > 0)
    }
}

//=========================================================================================
// Mistakes and Results
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MistakeCategory {
    #[serde(rename = "Concept Error")]
    ConceptError,
    #[serde(rename = "Calculation")]
    Calculation,
    #[serde(rename = "Misread Question")]
    MisreadQuestion,
    #[serde(rename = "Guessing")]
    Guessing,
}

impl fmt::Display for MistakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MistakeCategory::ConceptError => "Concept Error",
            MistakeCategory::Calculation => "Calculation",
            MistakeCategory::MisreadQuestion => "Misread Question",
            MistakeCategory::Guessing => "Guessing",
        };
        f.write_str(s)
    }
}

/// A note about one incorrectly answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeItem {
    pub id: Uuid,
    pub question_id: String,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub category: MistakeCategory,
    pub note: String,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
}

/// The outcome of one pass through a quiz section. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub topic: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub total_questions: u32,
    pub timestamp: DateTime<Utc>,
}

impl QuizResult {
    /// Fraction answered correctly, or `None` for an empty section.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_questions == 0 {
            None
        } else {
            Some(f64::from(self.score) / f64::from(self.total_questions))
        }
    }
}

//=========================================================================================
// Metrics
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricCategory {
    Core,
    Advanced,
    Performance,
}

/// One dimension of the derived performance profile. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub label: &'static str,
    pub score: u8,
    pub required: u8,
    pub category: MetricCategory,
}

impl Metric {
    pub fn is_blind_spot(&self) -> bool {
        self.score < self.required
    }
}

//=========================================================================================
// Roleplay
//=========================================================================================

/// The character a simulated student plays in teach-back mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Curious,
    Confused,
    Skeptical,
    Argumentative,
}

impl Persona {
    pub fn display_name(self) -> &'static str {
        match self {
            Persona::Curious => "Curious Casey",
            Persona::Confused => "Confused Jordan",
            Persona::Skeptical => "Skeptical Sam",
            Persona::Argumentative => "Argumentative Alex",
        }
    }

    /// How the student behaves, phrased for the model playing it.
    pub fn description(self) -> &'static str {
        match self {
            Persona::Curious => {
                "an eager student who asks follow-up questions and wants real-world examples"
            }
            Persona::Confused => {
                "a student who struggles with the material and asks for simpler explanations"
            }
            Persona::Skeptical => {
                "a student who doubts claims and asks for evidence and justification"
            }
            Persona::Argumentative => {
                "a student who challenges the teacher, proposes counterexamples and pushes back"
            }
        }
    }
}

/// An opaque reference to a conversational agent owned by the roleplay service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHandle {
    pub id: Uuid,
    pub persona: Persona,
}
