use crate::core::config::SearchSettings;
use crate::indexing::extract::Extractor;
use crate::indexing::fetch::{CurrentPage, DocumentFetcher, HttpFetcher};
use crate::indexing::loader::{ContentLoader, Coverage};
use crate::indexing::registry::ChapterRegistry;
use crate::search::engine::{self, MatchRecord, SearchLimits};
use crate::storage::content::ContentStore;
use crate::ui::presenter::{self, ResultsView};
use std::sync::Arc;

/// Everything one open page needs to search the site.
///
/// Built once per page load and shared by the query controller and the
/// presenter; the content store and loader live exactly as long as it does.
pub struct SearchSession {
    registry: Arc<ChapterRegistry>,
    store: Arc<ContentStore>,
    loader: Arc<ContentLoader>,
    settings: SearchSettings,
}

impl SearchSession {
    pub fn new(
        registry: ChapterRegistry,
        current: CurrentPage,
        fetcher: Arc<dyn DocumentFetcher>,
        settings: SearchSettings,
    ) -> Self {
        let registry = Arc::new(registry);
        let store = Arc::new(ContentStore::new(&registry));
        let loader = Arc::new(ContentLoader::new(
            registry.clone(),
            store.clone(),
            current,
            fetcher,
            Extractor::from_settings(&settings),
        ));

        Self {
            registry,
            store,
            loader,
            settings,
        }
    }

    /// Session fetching sibling chapters over HTTP relative to the open page
    pub fn for_page(registry: ChapterRegistry, current: CurrentPage, settings: SearchSettings) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(current.url.clone()));
        Self::new(registry, current, fetcher, settings)
    }

    pub fn registry(&self) -> &ChapterRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn loader(&self) -> &Arc<ContentLoader> {
        &self.loader
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Whether `query` is long enough to be searched at all
    pub fn accepts(&self, query: &str) -> bool {
        query.chars().count() >= self.settings.min_query_chars
    }

    /// Wait until the content store reached its final state
    pub async fn ensure_loaded(&self) -> Coverage {
        self.loader.load().await
    }

    /// Load if needed, then search every loaded chapter
    pub async fn search(&self, query: &str) -> (Vec<MatchRecord>, Coverage) {
        let coverage = self.ensure_loaded().await;
        let limits = SearchLimits {
            max_per_document: self.settings.max_matches_per_document,
            context_chars: self.settings.context_chars,
        };
        let matches = engine::search(query, &self.store, &self.registry, limits);
        tracing::debug!("Query {:?} matched {} times", query, matches.len());
        (matches, coverage)
    }

    /// Full query pipeline: length check, load, search, render
    pub async fn run_query(&self, raw: &str) -> ResultsView {
        let query = raw.trim();
        if !self.accepts(query) {
            return ResultsView::prompt(self.settings.min_query_chars);
        }
        let (matches, coverage) = self.search(query).await;
        presenter::render(&matches, query, coverage)
    }
}
