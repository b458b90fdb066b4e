//! crates/study_assistant_core/src/sources.rs
//!
//! The reference-source library. Selected sources become the context that is
//! appended to every generation request.

use crate::domain::SourceItem;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SourceLibrary {
    items: Vec<SourceItem>,
}

impl SourceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[SourceItem] {
        &self.items
    }

    pub fn add(&mut self, item: SourceItem) {
        info!("Added source '{}' ({:?})", item.title, item.source_type);
        self.items.push(item);
    }

    /// Flips the selection of a source. Returns the new state, or `None` if unknown.
    pub fn toggle(&mut self, id: Uuid) -> Option<bool> {
        let item = self.items.iter_mut().find(|s| s.id == id)?;
        item.is_selected = !item.is_selected;
        Some(item.is_selected)
    }

    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|s| s.id != id);
        before != self.items.len()
    }

    /// Removes every selected source and returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|s| !s.is_selected);
        before - self.items.len()
    }

    /// The text of all selected sources, each under a title header.
    pub fn selected_context(&self) -> String {
        self.items
            .iter()
            .filter(|s| s.is_selected)
            .filter_map(|s| {
                let body = s.content.as_deref().map(str::trim).filter(|c| !c.is_empty());
                match (body, &s.url) {
                    (Some(body), _) => Some(format!("SOURCE: {}\n{}", s.title, body)),
                    (None, Some(url)) => Some(format!("SOURCE: {} ({})", s.title, url)),
                    (None, None) => None,
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
