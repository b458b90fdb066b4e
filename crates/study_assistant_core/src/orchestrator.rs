//! crates/study_assistant_core/src/orchestrator.rs
//!
//! The generation orchestrator. A message from the learner either edits the
//! artifact on the active tab or fans out into independent generation calls,
//! one per artifact slot.
//!
//! Every call settles into its own slot. A failing call marks only its slot as
//! failed; siblings keep running. The chat summary is written once all calls
//! have settled.

use crate::artifacts::{ArtifactValue, SlotStatus, SlotTicket};
use crate::assistant::StudyAssistant;
use crate::domain::{Artifact, ArtifactKind, EditableKind, Role, Tab};
use crate::error::{StudyError, StudyResult};
use crate::events::StudyEvent;
use crate::ports::PortResult;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// How one slot's call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    Ready,
    Failed,
    /// The slot moved on (new query, regenerate) before the call settled.
    Discarded,
}

/// Which slots of a fan-out succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub succeeded: Vec<ArtifactKind>,
    pub failed: Vec<ArtifactKind>,
    pub discarded: Vec<ArtifactKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryOutcome {
    Edited {
        kind: EditableKind,
        outcome: SlotOutcome,
    },
    Generated(FanOutReport),
}

enum Plan {
    Edit {
        session_id: Uuid,
        current: Artifact,
        ticket: SlotTicket,
    },
    Generate {
        session_id: Uuid,
        prompt: String,
        tickets: Vec<SlotTicket>,
    },
}

/// The user-visible message left in a slot whose call failed.
pub fn fallback_message(kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Verification => {
            "Failed to verify the information. Please try again.".to_string()
        }
        other => format!("Failed to generate the {}. Please try again.", other),
    }
}

/// The text sent to the AI: the learner's query followed by the selected sources.
pub fn compose_prompt(query: &str, context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        query.to_string()
    } else {
        format!("{}\n\nREFERENCE MATERIAL:\n{}", query, context)
    }
}

impl StudyAssistant {
    /// Handles a message typed into the chat box while `active_tab` is shown.
    ///
    /// Service failures never escape: they end up as failed slots. Only input
    /// validation is reported as an error.
    pub async fn submit_query(&self, text: &str, active_tab: Tab) -> StudyResult<QueryOutcome> {
        let query = text.trim();
        if query.is_empty() {
            return Err(StudyError::Validation(
                "Please enter a question or topic first.".to_string(),
            ));
        }

        let plan = {
            let mut state = self.state.lock().await;
            let session_id = state.sessions.current_id();
            if let Some(message_id) = state.sessions.append(session_id, Role::User, query, vec![])
            {
                self.publish(StudyEvent::MessageAppended {
                    session_id,
                    message_id,
                });
            }

            let edit_target = active_tab
                .editable_kind()
                .and_then(|kind| state.artifacts.ready_artifact(kind));
            match edit_target {
                Some(current) => {
                    let ticket = state.artifacts.begin(current.kind().into());
                    Plan::Edit {
                        session_id,
                        current,
                        ticket,
                    }
                }
                None => {
                    let prompt = compose_prompt(query, &state.sources.selected_context());
                    state.artifacts.clear_all();
                    state.artifacts.set_last_query(prompt.clone());
                    let tickets = self
                        .fan_out_kinds()
                        .into_iter()
                        .map(|kind| state.artifacts.begin(kind))
                        .collect();
                    Plan::Generate {
                        session_id,
                        prompt,
                        tickets,
                    }
                }
            }
        };

        match plan {
            Plan::Edit {
                session_id,
                current,
                ticket,
            } => {
                let kind = current.kind();
                info!("Editing the {} with a chat instruction", ticket.kind);
                self.publish_status(ticket.kind, SlotStatus::Loading);
                let result = self
                    .services
                    .artifacts
                    .edit_artifact(kind, &current, query)
                    .await
                    .map(ArtifactValue::from);
                let outcome = self.settle(ticket, result).await;

                let reply = match outcome {
                    SlotOutcome::Ready => Some(format!("I've updated the {}.", ticket.kind)),
                    SlotOutcome::Failed => Some(fallback_message(ticket.kind)),
                    SlotOutcome::Discarded => None,
                };
                if let Some(reply) = reply {
                    self.append_reply(session_id, reply).await;
                }
                Ok(QueryOutcome::Edited { kind, outcome })
            }
            Plan::Generate {
                session_id,
                prompt,
                tickets,
            } => {
                info!("Fanning out {} generation calls", tickets.len());
                for ticket in &tickets {
                    self.publish_status(ticket.kind, SlotStatus::Loading);
                }
                let outcomes = join_all(tickets.iter().map(|t| self.run_slot(*t, &prompt))).await;

                let mut report = FanOutReport::default();
                for (ticket, outcome) in tickets.iter().zip(outcomes) {
                    match outcome {
                        SlotOutcome::Ready => report.succeeded.push(ticket.kind),
                        SlotOutcome::Failed => report.failed.push(ticket.kind),
                        SlotOutcome::Discarded => report.discarded.push(ticket.kind),
                    }
                }

                if report.succeeded.is_empty() && report.failed.is_empty() {
                    warn!("Every generation call was superseded; no summary written.");
                } else {
                    self.append_reply(session_id, summarize(&report)).await;
                }
                Ok(QueryOutcome::Generated(report))
            }
        }
    }

    /// Reissues a single slot's call with the last query, leaving the others alone.
    pub async fn regenerate(&self, kind: ArtifactKind) -> StudyResult<SlotOutcome> {
        let (ticket, prompt) = {
            let mut state = self.state.lock().await;
            let prompt = state
                .artifacts
                .last_query()
                .map(str::to_string)
                .ok_or_else(|| {
                    StudyError::Validation("There is nothing to regenerate yet.".to_string())
                })?;
            (state.artifacts.begin(kind), prompt)
        };
        info!("Regenerating the {}", kind);
        self.publish_status(kind, SlotStatus::Loading);
        Ok(self.run_slot(ticket, &prompt).await)
    }

    /// Fact-checks the last query on demand.
    pub async fn verify_latest(&self) -> StudyResult<SlotOutcome> {
        self.regenerate(ArtifactKind::Verification).await
    }

    /// True while any artifact slot is loading; the UI disables sending meanwhile.
    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.artifacts.is_busy()
    }

    fn fan_out_kinds(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|k| *k != ArtifactKind::Verification || self.config.auto_verify_on_query)
            .collect()
    }

    async fn run_slot(&self, ticket: SlotTicket, prompt: &str) -> SlotOutcome {
        let result = match ticket.kind {
            ArtifactKind::Explanation => self
                .services
                .explainer
                .explain(prompt)
                .await
                .map(ArtifactValue::Explanation),
            ArtifactKind::Visual => self
                .services
                .artifacts
                .generate_artifact(EditableKind::Visual, prompt)
                .await
                .map(ArtifactValue::from),
            ArtifactKind::Simulation => self
                .services
                .artifacts
                .generate_artifact(EditableKind::Simulation, prompt)
                .await
                .map(ArtifactValue::from),
            ArtifactKind::Verification => self
                .services
                .verifier
                .verify(prompt)
                .await
                .map(ArtifactValue::Verification),
        };
        self.settle(ticket, result).await
    }

    async fn settle(&self, ticket: SlotTicket, result: PortResult<ArtifactValue>) -> SlotOutcome {
        let outcome = match result {
            Ok(value) if value.kind() == ticket.kind => Ok(value),
            Ok(value) => {
                warn!(
                    "The {} call returned a {} artifact",
                    ticket.kind,
                    value.kind()
                );
                Err(fallback_message(ticket.kind))
            }
            Err(e) => {
                warn!("The {} call failed: {}", ticket.kind, e);
                Err(fallback_message(ticket.kind))
            }
        };
        let failed = outcome.is_err();

        let applied = self.state.lock().await.artifacts.settle(ticket, outcome);
        if !applied {
            info!("Discarded a stale {} response", ticket.kind);
            return SlotOutcome::Discarded;
        }
        if failed {
            self.publish_status(ticket.kind, SlotStatus::Failed);
            SlotOutcome::Failed
        } else {
            self.publish_status(ticket.kind, SlotStatus::Ready);
            SlotOutcome::Ready
        }
    }

    async fn append_reply(&self, session_id: Uuid, text: String) {
        let appended = self
            .state
            .lock()
            .await
            .sessions
            .append(session_id, Role::Model, text, vec![]);
        match appended {
            Some(message_id) => self.publish(StudyEvent::MessageAppended {
                session_id,
                message_id,
            }),
            None => info!("Session {} is gone; reply dropped", session_id),
        }
    }

    fn publish_status(&self, kind: ArtifactKind, status: SlotStatus) {
        self.publish(StudyEvent::SlotChanged { kind, status });
    }
}

fn summarize(report: &FanOutReport) -> String {
    let names = |kinds: &[ArtifactKind]| {
        kinds
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match (report.succeeded.is_empty(), report.failed.is_empty()) {
        (false, true) => format!("Here you go: I generated the {}.", names(&report.succeeded)),
        (false, false) => format!(
            "I generated the {}, but could not generate the {}.",
            names(&report.succeeded),
            names(&report.failed)
        ),
        _ => format!(
            "Sorry, I could not generate the {}. Please try again.",
            names(&report.failed)
        ),
    }
}
