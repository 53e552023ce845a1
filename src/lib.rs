// Core functionality
pub mod core {
    pub mod config;
    pub mod error;
}

// Session-scoped storage
pub mod storage {
    pub mod content;
    pub mod handoff;
}

// Chapter loading pipeline
pub mod indexing {
    pub mod export;
    pub mod extract;
    pub mod fetch;
    pub mod loader;
    pub mod registry;
}

// Search & highlighting
pub mod search {
    pub mod engine;
    pub mod highlight;
}

// User interfaces
pub mod ui {
    pub mod cli;
    pub mod controller;
    pub mod navigation;
    pub mod presenter;
}

pub mod session;

// Re-export commonly used types
pub use self::core::config::{Config, SearchSettings};
pub use self::core::error::{Error, Result};
pub use indexing::export::{export_chapters, ExportedChapter};
pub use indexing::extract::{ContentRegion, Extractor};
pub use indexing::fetch::{CurrentPage, DocumentFetcher, Environment, HttpFetcher};
pub use indexing::loader::{ContentLoader, Coverage, LoadState};
pub use indexing::registry::{ChapterDescriptor, ChapterRegistry};
pub use search::engine::{search, MatchRecord, SearchLimits};
pub use session::SearchSession;
pub use storage::content::{ChapterContent, ContentStore};
pub use storage::handoff::{HandoffState, HandoffStore};
pub use ui::cli::Cli;
pub use ui::controller::QueryController;
pub use ui::navigation::{HandoffOutcome, NavigationHandoff, Navigator, PageSurface, SiteNavigator, StaticPage};
pub use ui::presenter::{render, ResultsView, StatusLine};
