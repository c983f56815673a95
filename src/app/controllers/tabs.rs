use std::path::Path;

use crate::app::domain::document::{Document, DocumentId};

/// Result of inserting a document into a registry.
#[derive(Debug)]
pub struct AddOutcome {
    /// Final index of the new document.
    pub index: usize,
    /// Untitled, unmodified document that was active before and got
    /// superseded by a document with a real path.
    pub replaced: Option<Document>,
}

/// Ordered documents of one window and the active pointer.
///
/// `active_id` is `None` exactly when the registry is empty and otherwise
/// names a member.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
    active_id: Option<DocumentId>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `doc` after the active tab (or at the end) and activate it.
    pub fn add_document(&mut self, doc: Document, after_active: bool) -> AddOutcome {
        let previous = self.active_id;
        let supersedes = !doc.is_untitled();
        let id = doc.id;

        let mut index = match self.active_index() {
            Some(i) if after_active => i + 1,
            _ => self.documents.len(),
        };
        self.documents.insert(index, doc);
        self.active_id = Some(id);

        let replaced = match previous {
            Some(prev) if supersedes => {
                let pos = self.position_of(prev).filter(|&p| self.documents[p].is_placeholder());
                pos.map(|pos| {
                    if pos < index {
                        index -= 1;
                    }
                    self.documents.remove(pos)
                })
            }
            _ => None,
        };

        if let Some(ref old) = replaced {
            tracing::debug!(replaced = old.id.0, by = id.0, "placeholder superseded");
        }

        AddOutcome { index, replaced }
    }

    /// Insert `doc` at `index` (clamped) and activate it. Never supersedes
    /// a placeholder.
    pub fn insert_at(&mut self, doc: Document, index: usize) -> usize {
        let index = index.min(self.documents.len());
        self.active_id = Some(doc.id);
        self.documents.insert(index, doc);
        index
    }

    pub fn active_doc(&self) -> Option<&Document> {
        let active_id = self.active_id?;
        self.documents.iter().find(|d| d.id == active_id)
    }

    pub fn active_doc_mut(&mut self) -> Option<&mut Document> {
        let active_id = self.active_id?;
        self.documents.iter_mut().find(|d| d.id == active_id)
    }

    /// Activate a member. Returns false if it was already active or unknown.
    pub fn set_active(&mut self, id: DocumentId) -> bool {
        if self.active_id == Some(id) || !self.contains(id) {
            return false;
        }
        self.active_id = Some(id);
        true
    }

    /// Remove a document by id and hand it back. Activates the nearest neighbor.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<Document> {
        let idx = self.position_of(id)?;
        let doc = self.documents.remove(idx);

        if self.active_id == Some(id) {
            self.active_id = if self.documents.is_empty() {
                None
            } else {
                let new_idx = idx.min(self.documents.len() - 1);
                Some(self.documents[new_idx].id)
            };
        }

        Some(doc)
    }

    /// Move a tab from one index to another.
    /// `to` is an insertion index (0..=len) computed before the removal.
    pub fn move_tab(&mut self, from: usize, to: usize) {
        if from == to || from >= self.documents.len() {
            return;
        }
        let to = to.min(self.documents.len());
        let doc = self.documents.remove(from);
        // After removal, insertion indices > from shift down by 1
        let insert_at = if to > from { to - 1 } else { to };
        self.documents.insert(insert_at.min(self.documents.len()), doc);
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active_id
    }

    pub fn active_index(&self) -> Option<usize> {
        self.position_of(self.active_id?)
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.iter().any(|d| d.id == id)
    }

    pub fn position_of(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    /// Find a document by file path
    pub fn find_by_path(&self, path: &Path) -> Option<DocumentId> {
        self.documents
            .iter()
            .find(|d| d.path() == Some(path))
            .map(|d| d.id)
    }

    pub fn doc_by_id(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn doc_by_id_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id).collect()
    }

    /// Get the next document id (for tab cycling)
    pub fn next_doc_id(&self) -> Option<DocumentId> {
        let idx = self.active_index()?;
        let next_idx = (idx + 1) % self.documents.len();
        Some(self.documents[next_idx].id)
    }

    /// Get the previous document id (for tab cycling)
    pub fn prev_doc_id(&self) -> Option<DocumentId> {
        let idx = self.active_index()?;
        let prev_idx = if idx == 0 {
            self.documents.len() - 1
        } else {
            idx - 1
        };
        Some(self.documents[prev_idx].id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::AppSettings;
    use std::path::PathBuf;

    fn untitled(n: u64) -> Document {
        Document::new_untitled(DocumentId(n), n as u32, &AppSettings::default())
    }

    fn file(n: u64, path: &str) -> Document {
        let mut doc = untitled(n);
        doc.set_path(PathBuf::from(path));
        doc
    }

    fn assert_active_invariant(reg: &DocumentRegistry) {
        match reg.active_id() {
            None => assert!(reg.is_empty()),
            Some(id) => assert!(reg.contains(id)),
        }
    }

    #[test]
    fn test_add_inserts_after_active() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(file(1, "/a"), true);
        reg.add_document(file(2, "/b"), true);
        reg.set_active(DocumentId(1));
        let outcome = reg.add_document(file(3, "/c"), true);

        assert_eq!(outcome.index, 1);
        assert_eq!(reg.ids(), vec![DocumentId(1), DocumentId(3), DocumentId(2)]);
        assert_eq!(reg.active_id(), Some(DocumentId(3)));
    }

    #[test]
    fn test_add_at_end_when_not_after_active() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(file(1, "/a"), true);
        reg.add_document(file(2, "/b"), true);
        reg.set_active(DocumentId(1));
        let outcome = reg.add_document(file(3, "/c"), false);
        assert_eq!(outcome.index, 2);
    }

    #[test]
    fn test_active_placeholder_is_replaced_by_file() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(untitled(1), true);
        let outcome = reg.add_document(file(2, "/x"), true);

        assert_eq!(outcome.index, 0);
        assert_eq!(outcome.replaced.map(|d| d.id), Some(DocumentId(1)));
        assert_eq!(reg.ids(), vec![DocumentId(2)]);
    }

    #[test]
    fn test_untitled_does_not_replace_placeholder() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(untitled(1), true);
        let outcome = reg.add_document(untitled(2), true);
        assert!(outcome.replaced.is_none());
        assert_eq!(reg.count(), 2);
    }

    #[test]
    fn test_inactive_modified_untitled_is_left_alone() {
        // [A(modified, no path), B(saved, /x)], B active; add C(/y)
        let mut reg = DocumentRegistry::new();
        let mut a = untitled(1);
        a.set_text("draft");
        reg.add_document(a, true);
        reg.add_document(file(2, "/x"), true);
        assert_eq!(reg.active_id(), Some(DocumentId(2)));

        let outcome = reg.add_document(file(3, "/y"), true);
        assert!(outcome.replaced.is_none());
        assert_eq!(reg.ids(), vec![DocumentId(1), DocumentId(2), DocumentId(3)]);
        assert!(reg.doc_by_id(DocumentId(1)).is_some_and(|d| d.is_modified()));
    }

    #[test]
    fn test_set_active() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(file(1, "/a"), true);
        reg.add_document(file(2, "/b"), true);
        assert!(!reg.set_active(DocumentId(2)));
        assert!(!reg.set_active(DocumentId(9)));
        assert!(reg.set_active(DocumentId(1)));
    }

    #[test]
    fn test_remove_activates_nearest_neighbor() {
        let mut reg = DocumentRegistry::new();
        for (n, p) in [(1, "/a"), (2, "/b"), (3, "/c")] {
            reg.add_document(file(n, p), false);
        }
        reg.set_active(DocumentId(2));
        assert!(reg.remove_document(DocumentId(2)).is_some());
        assert_eq!(reg.active_id(), Some(DocumentId(3)));

        reg.remove_document(DocumentId(3));
        assert_eq!(reg.active_id(), Some(DocumentId(1)));

        reg.remove_document(DocumentId(1));
        assert_eq!(reg.active_id(), None);
        assert!(reg.remove_document(DocumentId(1)).is_none());
    }

    #[test]
    fn test_active_pointer_invariant_over_mixed_operations() {
        let mut reg = DocumentRegistry::new();
        let mut seed: u64 = 0x2545_f491;
        let mut next_id = 1;

        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let roll = (seed >> 33) % 4;
            if roll < 2 || reg.is_empty() {
                let doc = if roll == 0 {
                    untitled(next_id)
                } else {
                    file(next_id, &format!("/f{}", next_id))
                };
                reg.add_document(doc, roll == 1);
                next_id += 1;
            } else {
                let ids = reg.ids();
                let victim = ids[(seed >> 40) as usize % ids.len()];
                if roll == 2 {
                    reg.remove_document(victim);
                } else {
                    reg.set_active(victim);
                }
            }
            assert_active_invariant(&reg);
        }
    }

    #[test]
    fn test_move_tab() {
        let mut reg = DocumentRegistry::new();
        for (n, p) in [(1, "/a"), (2, "/b"), (3, "/c")] {
            reg.add_document(file(n, p), false);
        }
        reg.move_tab(0, 3);
        assert_eq!(reg.ids(), vec![DocumentId(2), DocumentId(3), DocumentId(1)]);
        reg.move_tab(2, 0);
        assert_eq!(reg.ids(), vec![DocumentId(1), DocumentId(2), DocumentId(3)]);
        reg.move_tab(7, 0);
        assert_eq!(reg.count(), 3);
    }

    #[test]
    fn test_position_and_find_by_path() {
        let mut reg = DocumentRegistry::new();
        for (n, p) in [(1, "/a"), (2, "/b"), (3, "/c")] {
            reg.add_document(file(n, p), false);
        }
        reg.move_tab(2, 0);
        assert_eq!(reg.position_of(DocumentId(3)), Some(0));
        assert_eq!(reg.find_by_path(Path::new("/b")), Some(DocumentId(2)));
        assert_eq!(reg.find_by_path(Path::new("/z")), None);
    }

    #[test]
    fn test_insert_at_keeps_placeholder() {
        let mut reg = DocumentRegistry::new();
        reg.add_document(untitled(1), true);
        assert_eq!(reg.insert_at(file(2, "/x"), 0), 0);
        assert_eq!(reg.ids(), vec![DocumentId(2), DocumentId(1)]);
        assert_eq!(reg.active_id(), Some(DocumentId(2)));
        assert_eq!(reg.insert_at(file(3, "/y"), 99), 2);
    }

    #[test]
    fn test_tab_cycling_wraps() {
        let mut reg = DocumentRegistry::new();
        for (n, p) in [(1, "/a"), (2, "/b"), (3, "/c")] {
            reg.add_document(file(n, p), false);
        }
        assert_eq!(reg.next_doc_id(), Some(DocumentId(1)));
        reg.set_active(DocumentId(1));
        assert_eq!(reg.prev_doc_id(), Some(DocumentId(3)));
        assert_eq!(DocumentRegistry::new().next_doc_id(), None);
    }
}
