use crate::indexing::registry::ChapterRegistry;
use crate::storage::content::ContentStore;

/// Marks a context window that was cut short
pub const ELLIPSIS: &str = "...";

/// One occurrence of the query in one chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub document_id: String,
    pub document_title: String,
    /// Text around the match, with [`ELLIPSIS`] on a clamped side
    pub context_text: String,
    /// Character offset of the match within the chapter text
    pub match_offset: usize,
    pub query_text: String,
}

/// Limits applied while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_per_document: usize,
    pub context_chars: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_per_document: 5,
            context_chars: 80,
        }
    }
}

/// Case-insensitive literal search over every loaded chapter.
///
/// Chapters are visited in registry order, each scanned left to right for
/// non-overlapping occurrences up to `max_per_document`. Chapters without
/// loaded text are skipped.
pub fn search(
    query: &str,
    store: &ContentStore,
    registry: &ChapterRegistry,
    limits: SearchLimits,
) -> Vec<MatchRecord> {
    let needle = fold(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut records = Vec::new();
    store.for_each_loaded(registry, |id, text| {
        let title = registry.title_of(id).unwrap_or(id);
        let chars: Vec<char> = text.chars().collect();
        let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();

        for offset in find_occurrences(&folded, &needle, limits.max_per_document) {
            records.push(MatchRecord {
                document_id: id.to_string(),
                document_title: title.to_string(),
                context_text: context_window(&chars, offset, needle.len(), limits.context_chars),
                match_offset: offset,
                query_text: query.to_string(),
            });
        }
    });

    records
}

/// Offsets of non-overlapping occurrences, capped at `max`
pub fn find_occurrences(haystack: &[char], needle: &[char], max: usize) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return found;
    }

    let last_start = haystack.len() - needle.len();
    let mut cursor = 0;
    while found.len() < max && cursor <= last_start {
        match (cursor..=last_start).find(|&i| haystack[i..i + needle.len()] == *needle) {
            Some(pos) => {
                found.push(pos);
                cursor = pos + needle.len();
            }
            None => break,
        }
    }
    found
}

/// Up to `radius` characters either side of the match, ellipsis where clamped
pub fn context_window(chars: &[char], offset: usize, len: usize, radius: usize) -> String {
    let start = offset.saturating_sub(radius);
    let end = (offset + len + radius).min(chars.len());

    let mut window = String::new();
    if start > 0 {
        window.push_str(ELLIPSIS);
    }
    window.extend(&chars[start..end]);
    if end < chars.len() {
        window.push_str(ELLIPSIS);
    }
    window
}

/// Lowercase a string one character at a time, keeping character positions aligned
pub fn fold(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

/// Single-character lowercase; characters whose lowercase form is longer stay as they are
pub fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Case-insensitive position (in characters) of `needle` in `haystack`
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    find_occurrences(&fold(haystack), &fold(needle), 1).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::registry::ChapterDescriptor;

    fn fixture(texts: &[(&str, &str)]) -> (ChapterRegistry, ContentStore) {
        let registry = ChapterRegistry::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, (id, _))| ChapterDescriptor::new(*id, format!("Chapter {}", i + 1)))
                .collect(),
        );
        let store = ContentStore::new(&registry);
        for (id, text) in texts {
            store.insert(id, text.to_string());
        }
        (registry, store)
    }

    #[test]
    fn test_one_match_per_chapter() {
        let (registry, store) = fixture(&[("ch1", "GDP growth is strong"), ("ch2", "GDP per capita rose")]);
        let records = search("GDP", &store, &registry, SearchLimits::default());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].document_id, "ch1");
        assert_eq!(records[0].document_title, "Chapter 1");
        assert_eq!(records[0].context_text, "GDP growth is strong");
        assert_eq!(records[1].document_id, "ch2");
        assert_eq!(records[1].match_offset, 0);
        assert_eq!(records[1].query_text, "GDP");
    }

    #[test]
    fn test_case_insensitive() {
        let (registry, store) = fixture(&[("ch1", "Inflationen steg. INFLATION faldt.")]);
        let records = search("inflation", &store, &registry, SearchLimits::default());
        let offsets: Vec<usize> = records.iter().map(|r| r.match_offset).collect();
        assert_eq!(offsets, vec![0, 18]);
    }

    #[test]
    fn test_non_overlapping() {
        let (registry, store) = fixture(&[("ch1", "aaaa")]);
        let records = search("aa", &store, &registry, SearchLimits::default());
        let offsets: Vec<usize> = records.iter().map(|r| r.match_offset).collect();
        assert_eq!(offsets, vec![0, 2]);
    }

    #[test]
    fn test_per_document_cap() {
        let text = vec!["rente"; 8].join(" og ");
        let (registry, store) = fixture(&[("ch1", text.as_str()), ("ch2", "rente")]);
        let records = search("rente", &store, &registry, SearchLimits::default());

        let ch1: Vec<usize> = records
            .iter()
            .filter(|r| r.document_id == "ch1")
            .map(|r| r.match_offset)
            .collect();
        assert_eq!(ch1, vec![0, 9, 18, 27, 36]);
        assert_eq!(records.len(), 6);
        assert_eq!(records[5].document_id, "ch2");
    }

    #[test]
    fn test_context_window_clamping() {
        let text = format!("{}BNP{}", "x".repeat(100), "y".repeat(100));
        let (registry, store) = fixture(&[("ch1", text.as_str())]);
        let records = search("bnp", &store, &registry, SearchLimits::default());

        let expected = format!("...{}BNP{}...", "x".repeat(80), "y".repeat(80));
        assert_eq!(records[0].context_text, expected);
        assert_eq!(records[0].match_offset, 100);
    }

    #[test]
    fn test_context_window_near_start() {
        let text = format!("Om BNP {}", "z".repeat(200));
        let (registry, store) = fixture(&[("ch1", text.as_str())]);
        let records = search("BNP", &store, &registry, SearchLimits::default());

        assert!(records[0].context_text.starts_with("Om BNP"));
        assert!(records[0].context_text.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_context_contains_query_once_ellipses_stripped() {
        let text = "Den økonomiske vækst målt i BNP var høj. ".repeat(20);
        let (registry, store) = fixture(&[("ch1", text.as_str())]);
        for record in search("bnp var", &store, &registry, SearchLimits::default()) {
            let stripped = record.context_text.trim_start_matches(ELLIPSIS).trim_end_matches(ELLIPSIS);
            assert!(find_case_insensitive(stripped, "bnp var").is_some());
        }
    }

    #[test]
    fn test_unloaded_chapters_skipped() {
        let registry = ChapterRegistry::new(vec![
            ChapterDescriptor::new("ch1", "Chapter 1"),
            ChapterDescriptor::new("ch2", "Chapter 2"),
        ]);
        let store = ContentStore::new(&registry);
        store.insert("ch2", "GDP".to_string());

        let records = search("gdp", &store, &registry, SearchLimits::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_id, "ch2");
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let (registry, store) = fixture(&[("ch1", "C++ og a.b men ikke axb")]);
        let records = search("a.b", &store, &registry, SearchLimits::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].match_offset, 7);
        assert_eq!(search("C++", &store, &registry, SearchLimits::default()).len(), 1);
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let (registry, store) = fixture(&[("ch1", "Økonomi og ØKONOMI")]);
        let records = search("økonomi", &store, &registry, SearchLimits::default());
        let offsets: Vec<usize> = records.iter().map(|r| r.match_offset).collect();
        assert_eq!(offsets, vec![0, 11]);
    }
}
