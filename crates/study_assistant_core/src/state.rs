//! crates/study_assistant_core/src/state.rs
//!
//! The explicit state container. Every sub-state is owned here and changed only
//! through the synchronous transition methods of its module, which keeps the
//! whole study session testable without a UI or an AI service.

use crate::artifacts::ArtifactStore;
use crate::domain::{MistakeCategory, MistakeItem, QuizResult};
use crate::error::StudyResult;
use crate::metrics::{derive_metrics, MetricsReport};
use crate::mistakes::MistakeLedger;
use crate::quiz::QuizEngine;
use crate::roleplay::Classroom;
use crate::sessions::SessionList;
use crate::sources::SourceLibrary;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct StudyState {
    pub sessions: SessionList,
    pub sources: SourceLibrary,
    pub artifacts: ArtifactStore,
    pub quiz: QuizEngine,
    pub mistakes: MistakeLedger,
    pub quiz_history: Vec<QuizResult>,
    pub classroom: Option<Classroom>,
}

impl StudyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new empty session. The artifacts belong to the session being
    /// left, so they are dropped along with anything still in flight.
    pub fn create_session(&mut self) -> Uuid {
        let id = self.sessions.create();
        self.artifacts.reset();
        id
    }

    pub fn select_session(&mut self, id: Uuid) -> StudyResult<()> {
        let previous = self.sessions.current_id();
        self.sessions.select(id)?;
        if previous != id {
            self.artifacts.reset();
        }
        Ok(())
    }

    /// Deletes a session; the artifacts are reset only if the current one changed.
    pub fn delete_session(&mut self, id: Uuid) {
        let previous = self.sessions.current_id();
        self.sessions.delete(id);
        if self.sessions.current_id() != previous {
            self.artifacts.reset();
        }
    }

    /// The current performance profile, derived fresh on every call.
    pub fn metrics(&self) -> MetricsReport {
        derive_metrics(self.mistakes.list(), &self.quiz_history)
    }

    /// Saves the quiz's pending mistake into the ledger.
    pub fn record_mistake(
        &mut self,
        category: MistakeCategory,
        note: impl Into<String>,
    ) -> StudyResult<MistakeItem> {
        let item = self.quiz.save_mistake(category, note)?;
        self.mistakes.add(item.clone())?;
        Ok(item)
    }

    /// Advances the quiz; a completed section's result goes into the history.
    pub fn advance_quiz(&mut self) -> StudyResult<Option<QuizResult>> {
        let result = self.quiz.advance()?;
        if let Some(result) = &result {
            self.quiz_history.push(result.clone());
        }
        Ok(result)
    }

    /// The material a quiz is built from when no topics are chosen: the selected
    /// sources, or else the last query sent for artifact generation.
    pub fn quiz_context(&self) -> String {
        let sources = self.sources.selected_context();
        if !sources.trim().is_empty() {
            return sources;
        }
        self.artifacts.last_query().unwrap_or_default().to_string()
    }
}
