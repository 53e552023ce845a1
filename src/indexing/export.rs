use crate::core::error::Result;
use crate::indexing::extract::Extractor;
use crate::indexing::registry::ChapterRegistry;
use std::fs;
use std::path::{Path, PathBuf};

/// One chapter written out as plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedChapter {
    pub id: String,
    pub path: PathBuf,
    /// Characters written, not bytes
    pub chars: usize,
}

/// Output file for a chapter: `kapitel3.html` -> `kapitel3_tekst.txt`
pub fn export_file_name(id: &str) -> String {
    let stem = Path::new(id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(id);
    format!("{}_tekst.txt", stem)
}

/// Write the article text of every chapter under `site_dir` into `out_dir`.
///
/// Chapters whose page is missing or has no content region are skipped with
/// a warning; the rest are written in registry order.
pub fn export_chapters(
    registry: &ChapterRegistry,
    site_dir: &Path,
    out_dir: &Path,
    extractor: &Extractor,
) -> Result<Vec<ExportedChapter>> {
    fs::create_dir_all(out_dir)?;

    let mut exported = Vec::new();
    for chapter in registry.chapters() {
        let source = site_dir.join(&chapter.id);
        if !source.is_file() {
            tracing::warn!("Skipping {} (missing): {}", chapter.id, source.display());
            continue;
        }

        let html = fs::read_to_string(&source)?;
        let region = match extractor.extract(&html) {
            Ok(region) => region,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", chapter.id, e);
                continue;
            }
        };

        let path = out_dir.join(export_file_name(&chapter.id));
        fs::write(&path, &region.text)?;
        tracing::debug!("Exported {} -> {}", chapter.id, path.display());

        exported.push(ExportedChapter {
            id: chapter.id.clone(),
            path,
            chars: region.text.chars().count(),
        });
    }

    Ok(exported)
}
