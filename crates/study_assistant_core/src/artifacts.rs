//! crates/study_assistant_core/src/artifacts.rs
//!
//! The artifact store: four independent slots (explanation, visual, simulation,
//! verification), each moving through `empty -> loading -> ready | failed`.
//!
//! Every call into a slot is issued against a ticket. Starting a new call bumps
//! the slot's generation, so a response that settles with an older ticket is
//! dropped instead of overwriting newer state.

use crate::domain::{
    Artifact, ArtifactKind, EditableKind, SimulationArtifact, Verification, VisualArtifact,
};
use serde::Serialize;

/// The state of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SlotState<T> {
    Empty,
    Loading,
    Ready(T),
    /// Holds the user-visible fallback message.
    Failed(String),
}

/// The shape of a slot's state without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Empty,
    Loading,
    Ready,
    Failed,
}

impl<T> SlotState<T> {
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotState::Empty => SlotStatus::Empty,
            SlotState::Loading => SlotStatus::Loading,
            SlotState::Ready(_) => SlotStatus::Ready,
            SlotState::Failed(_) => SlotStatus::Failed,
        }
    }
}

/// Identifies one in-flight call for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket {
    pub kind: ArtifactKind,
    generation: u64,
}

/// A settled value for any slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactValue {
    Explanation(String),
    Visual(VisualArtifact),
    Simulation(SimulationArtifact),
    Verification(Verification),
}

impl ArtifactValue {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactValue::Explanation(_) => ArtifactKind::Explanation,
            ArtifactValue::Visual(_) => ArtifactKind::Visual,
            ArtifactValue::Simulation(_) => ArtifactKind::Simulation,
            ArtifactValue::Verification(_) => ArtifactKind::Verification,
        }
    }
}

impl From<Artifact> for ArtifactValue {
    fn from(artifact: Artifact) -> Self {
        match artifact {
            Artifact::Visual(v) => ArtifactValue::Visual(v),
            Artifact::Simulation(s) => ArtifactValue::Simulation(s),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    state: SlotState<T>,
    generation: u64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: SlotState::Empty,
            generation: 0,
        }
    }

    fn begin(&mut self, kind: ArtifactKind) -> SlotTicket {
        self.generation += 1;
        self.state = SlotState::Loading;
        SlotTicket {
            kind,
            generation: self.generation,
        }
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.state = SlotState::Empty;
    }

    fn settle(&mut self, ticket: SlotTicket, outcome: Result<T, String>) -> bool {
        if ticket.generation != self.generation || !matches!(self.state, SlotState::Loading) {
            return false;
        }
        self.state = match outcome {
            Ok(value) => SlotState::Ready(value),
            Err(message) => SlotState::Failed(message),
        };
        true
    }
}

/// A serializable copy of all four slots.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactsView {
    pub explanation: SlotState<String>,
    pub visual: SlotState<VisualArtifact>,
    pub simulation: SlotState<SimulationArtifact>,
    pub verification: SlotState<Verification>,
    pub last_query: Option<String>,
}

/// Holds the generated artifacts for the current query.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    explanation: Slot<String>,
    visual: Slot<VisualArtifact>,
    simulation: Slot<SimulationArtifact>,
    verification: Slot<Verification>,
    last_query: Option<String>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self {
            explanation: Slot::new(),
            visual: Slot::new(),
            simulation: Slot::new(),
            verification: Slot::new(),
            last_query: None,
        }
    }

    /// Moves a slot to `loading` and returns the ticket its result must settle with.
    /// Any call still pending for the slot is superseded.
    pub fn begin(&mut self, kind: ArtifactKind) -> SlotTicket {
        match kind {
            ArtifactKind::Explanation => self.explanation.begin(kind),
            ArtifactKind::Visual => self.visual.begin(kind),
            ArtifactKind::Simulation => self.simulation.begin(kind),
            ArtifactKind::Verification => self.verification.begin(kind),
        }
    }

    /// Applies a settled call. Returns `false` when the ticket is stale (or does not
    /// match the value's kind) and nothing changed.
    pub fn settle(&mut self, ticket: SlotTicket, outcome: Result<ArtifactValue, String>) -> bool {
        use ArtifactKind as K;
        match (ticket.kind, outcome) {
            (K::Explanation, Ok(ArtifactValue::Explanation(v))) => {
                self.explanation.settle(ticket, Ok(v))
            }
            (K::Visual, Ok(ArtifactValue::Visual(v))) => self.visual.settle(ticket, Ok(v)),
            (K::Simulation, Ok(ArtifactValue::Simulation(v))) => {
                self.simulation.settle(ticket, Ok(v))
            }
            (K::Verification, Ok(ArtifactValue::Verification(v))) => {
                self.verification.settle(ticket, Ok(v))
            }
            (_, Ok(_)) => false,
            (K::Explanation, Err(m)) => self.explanation.settle(ticket, Err(m)),
            (K::Visual, Err(m)) => self.visual.settle(ticket, Err(m)),
            (K::Simulation, Err(m)) => self.simulation.settle(ticket, Err(m)),
            (K::Verification, Err(m)) => self.verification.settle(ticket, Err(m)),
        }
    }

    /// Empties every slot and invalidates anything still in flight.
    pub fn clear_all(&mut self) {
        self.explanation.clear();
        self.visual.clear();
        self.simulation.clear();
        self.verification.clear();
    }

    /// Forgets the artifacts and the last query of the session being left.
    pub fn reset(&mut self) {
        self.clear_all();
        self.last_query = None;
    }

    pub fn status(&self, kind: ArtifactKind) -> SlotStatus {
        match kind {
            ArtifactKind::Explanation => self.explanation.state.status(),
            ArtifactKind::Visual => self.visual.state.status(),
            ArtifactKind::Simulation => self.simulation.state.status(),
            ArtifactKind::Verification => self.verification.state.status(),
        }
    }

    /// True while any slot has a call in flight.
    pub fn is_busy(&self) -> bool {
        ArtifactKind::ALL
            .iter()
            .any(|k| self.status(*k) == SlotStatus::Loading)
    }

    /// The ready artifact of an editable kind, if there is one.
    pub fn ready_artifact(&self, kind: EditableKind) -> Option<Artifact> {
        match kind {
            EditableKind::Visual => match &self.visual.state {
                SlotState::Ready(v) => Some(Artifact::Visual(v.clone())),
                _ => None,
            },
            EditableKind::Simulation => match &self.simulation.state {
                SlotState::Ready(s) => Some(Artifact::Simulation(s.clone())),
                _ => None,
            },
        }
    }

    pub fn explanation(&self) -> &SlotState<String> {
        &self.explanation.state
    }

    pub fn verification(&self) -> &SlotState<Verification> {
        &self.verification.state
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn set_last_query(&mut self, query: impl Into<String>) {
        self.last_query = Some(query.into());
    }

    pub fn view(&self) -> ArtifactsView {
        ArtifactsView {
            explanation: self.explanation.state.clone(),
            visual: self.visual.state.clone(),
            simulation: self.simulation.state.clone(),
            verification: self.verification.state.clone(),
            last_query: self.last_query.clone(),
        }
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visual(data: &str) -> ArtifactValue {
        ArtifactValue::Visual(VisualArtifact {
            mime_type: "image/svg+xml".to_string(),
            data: data.to_string(),
            prompt: "cells".to_string(),
        })
    }

    #[test]
    fn slot_lifecycle() {
        let mut store = ArtifactStore::new();
        assert_eq!(store.status(ArtifactKind::Visual), SlotStatus::Empty);

        let ticket = store.begin(ArtifactKind::Visual);
        assert_eq!(store.status(ArtifactKind::Visual), SlotStatus::Loading);
        assert!(store.is_busy());

        assert!(store.settle(ticket, Ok(visual("<svg/>"))));
        assert_eq!(store.status(ArtifactKind::Visual), SlotStatus::Ready);
        assert!(store.ready_artifact(EditableKind::Visual).is_some());
        assert!(!store.is_busy());
    }

    #[test]
    fn stale_tickets_are_discarded() {
        let mut store = ArtifactStore::new();
        let old = store.begin(ArtifactKind::Visual);
        let new = store.begin(ArtifactKind::Visual);

        assert!(!store.settle(old, Ok(visual("old"))));
        assert_eq!(store.status(ArtifactKind::Visual), SlotStatus::Loading);

        assert!(store.settle(new, Ok(visual("new"))));
        match store.ready_artifact(EditableKind::Visual) {
            Some(Artifact::Visual(v)) => assert_eq!(v.data, "new"),
            other => panic!("unexpected artifact: {:?}", other),
        }
    }

    #[test]
    fn clearing_invalidates_in_flight_calls() {
        let mut store = ArtifactStore::new();
        let ticket = store.begin(ArtifactKind::Explanation);
        store.clear_all();

        assert!(!store.settle(ticket, Ok(ArtifactValue::Explanation("late".into()))));
        assert_eq!(store.status(ArtifactKind::Explanation), SlotStatus::Empty);
    }

    #[test]
    fn failures_carry_the_fallback_message() {
        let mut store = ArtifactStore::new();
        let ticket = store.begin(ArtifactKind::Explanation);
        assert!(store.settle(ticket, Err("Failed to generate the explanation.".into())));

        assert_eq!(
            store.explanation(),
            &SlotState::Failed("Failed to generate the explanation.".into())
        );
        // A settled slot ignores a repeat of the same ticket.
        assert!(!store.settle(ticket, Ok(ArtifactValue::Explanation("again".into()))));
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let mut store = ArtifactStore::new();
        let ticket = store.begin(ArtifactKind::Simulation);
        assert!(!store.settle(ticket, Ok(visual("<svg/>"))));
        assert_eq!(store.status(ArtifactKind::Simulation), SlotStatus::Loading);
    }
}
