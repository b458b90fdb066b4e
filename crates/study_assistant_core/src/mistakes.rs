//! crates/study_assistant_core/src/mistakes.rs
//!
//! The mistake ledger: one note per incorrectly answered question, kept in
//! insertion order for the whole session.

use crate::domain::{MistakeCategory, MistakeItem};
use crate::error::{StudyError, StudyResult};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MistakeLedger {
    items: Vec<MistakeItem>,
}

impl MistakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: MistakeItem) -> StudyResult<()> {
        if self.items.iter().any(|m| m.id == item.id) {
            return Err(StudyError::DuplicateId(item.id));
        }
        debug!("Recorded mistake {} ({})", item.id, item.category);
        self.items.push(item);
        Ok(())
    }

    /// Replaces the note of an item. Returns whether the item exists.
    pub fn update(&mut self, id: Uuid, note: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|m| m.id == id) {
            Some(item) => {
                item.note = note.into();
                true
            }
            None => false,
        }
    }

    pub fn recategorize(&mut self, id: Uuid, category: MistakeCategory) -> bool {
        match self.items.iter_mut().find(|m| m.id == id) {
            Some(item) => {
                item.category = category;
                true
            }
            None => false,
        }
    }

    /// Removes an item. Deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|m| m.id != id);
        before != self.items.len()
    }

    pub fn list(&self) -> &[MistakeItem] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mistake(question: &str) -> MistakeItem {
        MistakeItem {
            id: Uuid::new_v4(),
            question_id: format!("q-{}", question),
            question_text: question.to_string(),
            user_answer: "wrong".to_string(),
            correct_answer: "right".to_string(),
            category: MistakeCategory::Guessing,
            note: String::new(),
            topic: "Biology".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn list_reflects_net_effect_in_insertion_order() {
        let mut ledger = MistakeLedger::new();
        let first = mistake("one");
        let second = mistake("two");
        let third = mistake("three");
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);

        ledger.add(first).unwrap();
        ledger.add(second).unwrap();
        ledger.add(third).unwrap();
        assert!(ledger.update(third_id, "mixed up the terms"));
        assert!(ledger.delete(second_id));

        let ids: Vec<Uuid> = ledger.list().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first_id, third_id]);
        assert_eq!(ledger.list()[1].note, "mixed up the terms");
    }

    #[test]
    fn deleting_twice_is_idempotent() {
        let mut ledger = MistakeLedger::new();
        let item = mistake("one");
        let id = item.id;
        ledger.add(item).unwrap();

        assert!(ledger.delete(id));
        assert!(!ledger.delete(id));
        assert!(ledger.list().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut ledger = MistakeLedger::new();
        let item = mistake("one");
        ledger.add(item.clone()).unwrap();
        assert!(matches!(ledger.add(item), Err(StudyError::DuplicateId(_))));
        assert_eq!(ledger.list().len(), 1);
    }

    #[test]
    fn recategorize_only_touches_known_items() {
        let mut ledger = MistakeLedger::new();
        let item = mistake("one");
        let id = item.id;
        ledger.add(item).unwrap();

        assert!(ledger.recategorize(id, MistakeCategory::Calculation));
        assert!(!ledger.recategorize(Uuid::new_v4(), MistakeCategory::Calculation));
        assert_eq!(ledger.list()[0].category, MistakeCategory::Calculation);
    }
}
