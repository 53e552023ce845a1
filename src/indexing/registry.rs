use crate::core::error::{Error, Result};
use crate::indexing::extract::page_title;
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Chapter pages are named like `kapitel3.html`: a word followed by the chapter number
static CHAPTER_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z_-]+(\d+)\.html?$").expect("chapter pattern is valid"));

/// One chapter page of the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDescriptor {
    /// Relative path of the page, e.g. `kapitel2.html`
    pub id: String,
    /// Human-readable chapter title
    pub title: String,
}

impl ChapterDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: normalize_id(&id.into()),
            title: title.into(),
        }
    }
}

/// Ordered, immutable list of chapters.
///
/// Order defines both search result grouping and the previous/next ring used
/// by the navigation arrows.
#[derive(Debug, Clone, Default)]
pub struct ChapterRegistry {
    chapters: Vec<ChapterDescriptor>,
}

impl ChapterRegistry {
    pub fn new(chapters: Vec<ChapterDescriptor>) -> Self {
        Self { chapters }
    }

    /// Build the registry from the chapter pages of a local site checkout
    pub fn discover(site_dir: &Path) -> Result<Self> {
        if !site_dir.is_dir() {
            return Err(Error::Config(format!(
                "Site directory does not exist: {}",
                site_dir.display()
            )));
        }

        let walker = WalkBuilder::new(site_dir)
            .max_depth(Some(1))
            .hidden(true)
            .git_ignore(true)
            .build();

        let mut found: Vec<(u32, ChapterDescriptor)> = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Failed to access site file: {}", err);
                    continue;
                }
            };
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(number) = chapter_number(file_name) else {
                continue;
            };

            let html = std::fs::read_to_string(path)?;
            let title = page_title(&html).unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            });
            found.push((number, ChapterDescriptor::new(file_name, title)));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        tracing::debug!("Discovered {} chapters in {}", found.len(), site_dir.display());

        Ok(Self::new(found.into_iter().map(|(_, chapter)| chapter).collect()))
    }

    pub fn chapters(&self) -> &[ChapterDescriptor] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        let id = normalize_id(id);
        self.chapters.iter().position(|c| c.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ChapterDescriptor> {
        self.position(id).map(|i| &self.chapters[i])
    }

    pub fn title_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|c| c.title.as_str())
    }

    /// Following chapter, wrapping from the last back to the first
    pub fn next(&self, id: &str) -> Option<&ChapterDescriptor> {
        let i = self.position(id)?;
        self.chapters.get((i + 1) % self.chapters.len())
    }

    /// Preceding chapter, wrapping from the first to the last
    pub fn previous(&self, id: &str) -> Option<&ChapterDescriptor> {
        let i = self.position(id)?;
        let len = self.chapters.len();
        self.chapters.get((i + len - 1) % len)
    }
}

/// Reduce a page reference to its registry id: no query, fragment or leading `./` `/`
pub fn normalize_id(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let mut id = &raw[..end];
    loop {
        if let Some(rest) = id.strip_prefix("./") {
            id = rest;
        } else if let Some(rest) = id.strip_prefix('/') {
            id = rest;
        } else {
            break;
        }
    }
    id.to_string()
}

/// Chapter number of a page file name, if it is a chapter page
pub fn chapter_number(file_name: &str) -> Option<u32> {
    CHAPTER_FILE_RE
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
}
