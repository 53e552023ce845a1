use crate::indexing::registry::{normalize_id, ChapterRegistry};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Extracted text of one chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub text: String,
    pub loaded: bool,
}

/// In-memory chapter text keyed by document id.
///
/// Every registry id has an entry from construction on; entries flip to
/// `loaded` one at a time as the loader finishes each page and are never
/// rewritten afterwards.
#[derive(Debug, Default)]
pub struct ContentStore {
    entries: RwLock<HashMap<String, ChapterContent>>,
}

impl ContentStore {
    pub fn new(registry: &ChapterRegistry) -> Self {
        let entries = registry
            .chapters()
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    ChapterContent {
                        text: String::new(),
                        loaded: false,
                    },
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Record the text of a document. Returns false when the entry was
    /// already loaded, in which case the stored text is left untouched.
    pub(crate) fn insert(&self, id: &str, text: String) -> bool {
        let mut entries = self.entries.write();
        let entry = entries.entry(normalize_id(id)).or_insert(ChapterContent {
            text: String::new(),
            loaded: false,
        });
        if entry.loaded {
            return false;
        }
        entry.text = text;
        entry.loaded = true;
        true
    }

    /// Text of a loaded document
    pub fn text(&self, id: &str) -> Option<String> {
        self.entries
            .read()
            .get(&normalize_id(id))
            .filter(|c| c.loaded)
            .map(|c| c.text.clone())
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.entries
            .read()
            .get(&normalize_id(id))
            .is_some_and(|c| c.loaded)
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.read().values().filter(|c| c.loaded).count()
    }

    /// Run `f` over the loaded documents in registry order
    pub fn for_each_loaded<F>(&self, registry: &ChapterRegistry, mut f: F)
    where
        F: FnMut(&str, &str),
    {
        let entries = self.entries.read();
        for chapter in registry.chapters() {
            if let Some(content) = entries.get(&chapter.id).filter(|c| c.loaded) {
                f(&chapter.id, &content.text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::registry::ChapterDescriptor;

    fn registry() -> ChapterRegistry {
        ChapterRegistry::new(vec![
            ChapterDescriptor::new("ch1", "Chapter 1"),
            ChapterDescriptor::new("ch2", "Chapter 2"),
        ])
    }

    #[test]
    fn test_entries_start_unloaded() {
        let store = ContentStore::new(&registry());
        assert_eq!(store.loaded_count(), 0);
        assert!(!store.is_loaded("ch1"));
        assert!(store.text("ch1").is_none());
    }

    #[test]
    fn test_loaded_text_is_immutable() {
        let store = ContentStore::new(&registry());
        assert!(store.insert("ch1", "first".to_string()));
        assert!(!store.insert("ch1#top", "second".to_string()));
        assert_eq!(store.text("ch1").as_deref(), Some("first"));
        assert_eq!(store.loaded_count(), 1);
    }

    #[test]
    fn test_for_each_loaded_uses_registry_order() {
        let store = ContentStore::new(&registry());
        store.insert("ch2", "two".to_string());
        store.insert("ch1", "one".to_string());

        let mut seen = Vec::new();
        store.for_each_loaded(&registry(), |id, text| seen.push(format!("{id}:{text}")));
        assert_eq!(seen, vec!["ch1:one", "ch2:two"]);
    }
}
