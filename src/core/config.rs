use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for chaptersearch
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for chaptersearch data
    pub base_dir: PathBuf,
    /// Directory for session-scoped state
    pub session_dir: PathBuf,
    /// Path to the navigation handoff store
    pub handoff_path: PathBuf,
    /// Path to the optional search settings file
    pub settings_path: PathBuf,
}

impl Config {
    /// Get the default configuration directory
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
            .map(|home| home.join(".chaptersearch"))
    }

    /// Create a new configuration
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.unwrap_or_else(|| {
            Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(".chaptersearch"))
        });
        let session_dir = base_dir.join("session");

        Ok(Self {
            handoff_path: session_dir.join("handoff.redb"),
            settings_path: base_dir.join("settings.json"),
            session_dir,
            base_dir,
        })
    }

    /// Initialize the configuration directories
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(&self.session_dir)?;
        Ok(())
    }

    /// Check if the configuration is already initialized
    pub fn is_initialized(&self) -> bool {
        self.base_dir.exists() && self.session_dir.exists()
    }

    /// Load search settings, falling back to defaults when no file exists
    pub fn load_settings(&self) -> Result<SearchSettings> {
        SearchSettings::load(&self.settings_path)
    }
}

/// Tunables for loading, searching and presenting results.
///
/// Every field has a default, so a settings file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Quiet window before a burst of input triggers a search
    pub debounce_ms: u64,
    /// Queries shorter than this (in characters) are never searched
    pub min_query_chars: usize,
    /// Occurrences reported per document before moving on
    pub max_matches_per_document: usize,
    /// Characters of context kept on each side of a match
    pub context_chars: usize,
    /// How long the handoff emphasis stays on the scrolled-to element
    pub emphasis_ms: u64,
    /// Delay before the handoff walks the freshly rendered page
    pub settle_ms: u64,
    /// Tag name of the principal content container
    pub content_selector: String,
    /// Class names whose subtrees are left out of the extracted text
    pub excluded_classes: Vec<String>,
    /// Tag names whose subtrees are left out of the extracted text
    pub excluded_tags: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_chars: 3,
            max_matches_per_document: 5,
            context_chars: 80,
            emphasis_ms: 3000,
            settle_ms: 100,
            content_selector: "article".to_string(),
            excluded_classes: vec!["quiz-container".to_string(), "podcast-section".to_string()],
            excluded_tags: vec!["script".to_string(), "style".to_string()],
        }
    }
}

impl SearchSettings {
    /// Read settings from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("Invalid settings file {}: {}", path.display(), e))
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn emphasis(&self) -> Duration {
        Duration::from_millis(self.emphasis_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(Some(temp_dir.path().join("cs"))).unwrap();
        assert!(config.handoff_path.ends_with("session/handoff.redb"));
        assert!(config.settings_path.ends_with("settings.json"));
        assert!(!config.is_initialized());

        config.init().unwrap();
        assert!(config.is_initialized());
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = SearchSettings::load(&temp_dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, SearchSettings::default());
        assert_eq!(settings.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_settings_file_overrides_named_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "context_chars": 40, "excluded_classes": ["aside"] }"#).unwrap();

        let settings = SearchSettings::load(&path).unwrap();
        assert_eq!(settings.context_chars, 40);
        assert_eq!(settings.excluded_classes, vec!["aside".to_string()]);
        assert_eq!(settings.min_query_chars, 3);
    }

    #[test]
    fn test_invalid_settings_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(SearchSettings::load(&path), Err(Error::Config(_))));
    }
}
