//! crates/study_assistant_core/src/sessions.rs
//!
//! The list of chat sessions. Exactly one session is current at any time and the
//! list is never empty.

use crate::domain::{Attachment, ChatMessage, ChatSession, Role};
use crate::error::{StudyError, StudyResult};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_TITLE: &str = "New Session";
const TITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone)]
pub struct SessionList {
    sessions: Vec<ChatSession>,
    current: Uuid,
}

impl SessionList {
    /// Creates a list holding one empty, current session.
    pub fn new() -> Self {
        let first = empty_session();
        let current = first.id;
        Self {
            sessions: vec![first],
            current,
        }
    }

    pub fn list(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current_id(&self) -> Uuid {
        self.current
    }

    pub fn current(&self) -> &ChatSession {
        // `current` always names a live session; the fallback keeps this total.
        self.get(self.current).unwrap_or(&self.sessions[0])
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Starts a new empty session and makes it current.
    pub fn create(&mut self) -> Uuid {
        let session = empty_session();
        let id = session.id;
        self.sessions.push(session);
        self.current = id;
        info!("Created chat session {}", id);
        id
    }

    pub fn select(&mut self, id: Uuid) -> StudyResult<()> {
        if self.get(id).is_none() {
            return Err(StudyError::NotFound(format!("session {}", id)));
        }
        self.current = id;
        Ok(())
    }

    /// Removes a session. Unknown ids are ignored. Removing the last session
    /// leaves a fresh empty one behind.
    pub fn delete(&mut self, id: Uuid) {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return;
        }
        info!("Deleted chat session {}", id);

        if self.sessions.is_empty() {
            self.create();
        } else if self.current == id {
            self.current = self.sessions[0].id;
        }
    }

    /// Appends a message to a session. Returns `None` if the session is gone,
    /// in which case the message is dropped.
    pub fn append(
        &mut self,
        session_id: Uuid,
        role: Role,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Option<Uuid> {
        let session = self.sessions.iter_mut().find(|s| s.id == session_id)?;
        let text = text.into();

        let first_user_message =
            role == Role::User && !session.messages.iter().any(|m| m.role == Role::User);
        if first_user_message && !text.trim().is_empty() {
            session.title = text.trim().chars().take(TITLE_MAX_CHARS).collect();
        }

        let message = ChatMessage {
            id: Uuid::new_v4(),
            role,
            text,
            timestamp: Utc::now(),
            attachments,
        };
        let id = message.id;
        session.messages.push(message);
        Some(id)
    }
}

impl Default for SessionList {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_session() -> ChatSession {
    ChatSession {
        id: Uuid::new_v4(),
        title: DEFAULT_TITLE.to_string(),
        messages: Vec::new(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_current_session() {
        let list = SessionList::new();
        assert_eq!(list.list().len(), 1);
        assert_eq!(list.current().id, list.current_id());
    }

    #[test]
    fn deleting_the_last_session_creates_a_fresh_one() {
        let mut list = SessionList::new();
        let only = list.current_id();
        list.delete(only);

        assert_eq!(list.list().len(), 1);
        assert_ne!(list.current_id(), only);
        assert!(list.current().messages.is_empty());
    }

    #[test]
    fn deleting_the_current_session_falls_back_to_the_first() {
        let mut list = SessionList::new();
        let first = list.current_id();
        let second = list.create();
        assert_eq!(list.current_id(), second);

        list.delete(second);
        assert_eq!(list.current_id(), first);
        assert_eq!(list.list().len(), 1);
    }

    #[test]
    fn deleting_an_unknown_session_is_a_no_op() {
        let mut list = SessionList::new();
        let current = list.current_id();
        list.delete(Uuid::new_v4());
        assert_eq!(list.list().len(), 1);
        assert_eq!(list.current_id(), current);
    }

    #[test]
    fn first_user_message_names_the_session() {
        let mut list = SessionList::new();
        let id = list.current_id();
        list.append(id, Role::User, "Explain photosynthesis in plants", vec![]);
        list.append(id, Role::User, "And respiration?", vec![]);

        let session = list.current();
        assert_eq!(session.title, "Explain photosynthesis in plants");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].text, "And respiration?");
    }

    #[test]
    fn messages_for_a_deleted_session_are_dropped() {
        let mut list = SessionList::new();
        let stale = list.current_id();
        list.create();
        list.delete(stale);

        assert!(list.append(stale, Role::Model, "late reply", vec![]).is_none());
    }

    #[test]
    fn selecting_an_unknown_session_fails() {
        let mut list = SessionList::new();
        assert!(matches!(
            list.select(Uuid::new_v4()),
            Err(StudyError::NotFound(_))
        ));
    }
}
