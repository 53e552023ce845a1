use crate::core::error::Result;
use crate::indexing::extract::Extractor;
use crate::indexing::fetch::{CurrentPage, DocumentFetcher, Environment};
use crate::indexing::registry::{normalize_id, ChapterRegistry};
use crate::storage::content::ContentStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// How much of the chapter set a finished load pass made searchable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Every chapter loaded
    Full,
    /// Some sibling fetches failed
    Partial { loaded: usize, total: usize },
    /// Local-file environment: only the open chapter is searchable
    CurrentOnly,
}

impl Coverage {
    /// True when the environment restricted the search to the open chapter
    pub fn is_restricted(&self) -> bool {
        matches!(self, Coverage::CurrentOnly)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadState {
    pub is_loading: bool,
    pub is_complete: bool,
}

/// Fills the content store exactly once per session.
///
/// The first caller of [`ContentLoader::load`] spawns the pass on its own
/// task; every caller, that one included, then waits for the published
/// coverage. Dropping a waiting caller never stops the pass.
pub struct ContentLoader {
    registry: Arc<ChapterRegistry>,
    store: Arc<ContentStore>,
    current: CurrentPage,
    environment: Environment,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Extractor,
    pass: watch::Sender<Option<Coverage>>,
    started: AtomicBool,
    loading: AtomicBool,
    attempts: AtomicUsize,
}

impl ContentLoader {
    pub fn new(
        registry: Arc<ChapterRegistry>,
        store: Arc<ContentStore>,
        current: CurrentPage,
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Extractor,
    ) -> Self {
        let environment = current.environment();
        Self {
            registry,
            store,
            current,
            environment,
            fetcher,
            extractor,
            pass: watch::channel(None).0,
            started: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Start the load pass if nobody has, then wait for it to finish
    pub async fn load(self: &Arc<Self>) -> Coverage {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.loading.store(true, Ordering::SeqCst);
            let loader = Arc::clone(self);
            tokio::spawn(async move {
                let coverage = loader.run_pass().await;
                loader.loading.store(false, Ordering::SeqCst);
                loader.pass.send_replace(Some(coverage));
            });
        }

        let mut finished = self.pass.subscribe();
        let published = finished.wait_for(Option::is_some).await.ok().and_then(|c| *c);
        // The sender lives in `self`, so the wait only ends once coverage is set
        published.unwrap_or_else(|| self.measure_coverage())
    }

    pub fn state(&self) -> LoadState {
        LoadState {
            is_loading: self.loading.load(Ordering::SeqCst),
            is_complete: self.pass.borrow().is_some(),
        }
    }

    /// Coverage of the finished pass, if it finished
    pub fn coverage(&self) -> Option<Coverage> {
        *self.pass.borrow()
    }

    /// Number of load passes ever started
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    async fn run_pass(&self) -> Coverage {
        tracing::info!(
            "Loading chapter content ({} chapters, current page {})",
            self.registry.len(),
            self.current.id
        );

        // The open page is already rendered; no fetch needed
        match self.extractor.extract(&self.current.html) {
            Ok(region) => {
                self.store.insert(&self.current.id, region.text);
                tracing::debug!("Loaded current page {}", self.current.id);
            }
            Err(e) => tracing::warn!("Failed to extract current page {}: {}", self.current.id, e),
        }

        if self.environment.is_local_file() {
            tracing::info!("Page opened from a local file; only {} is searchable", self.current.id);
        } else {
            self.load_siblings().await;
        }

        let coverage = self.measure_coverage();
        if let Coverage::Partial { loaded, total } = coverage {
            tracing::warn!("Loaded {} of {} chapters", loaded, total);
        }
        tracing::info!("Content load finished: {:?}", coverage);
        coverage
    }

    fn measure_coverage(&self) -> Coverage {
        if self.environment.is_local_file() {
            return Coverage::CurrentOnly;
        }
        let total = self.registry.len();
        let loaded = self
            .registry
            .chapters()
            .iter()
            .filter(|c| self.store.is_loaded(&c.id))
            .count();
        if loaded >= total {
            Coverage::Full
        } else {
            Coverage::Partial { loaded, total }
        }
    }

    /// Fetch the other chapters one at a time, in registry order
    async fn load_siblings(&self) {
        let current_id = normalize_id(&self.current.id);
        for chapter in self.registry.chapters() {
            if chapter.id == current_id || self.store.is_loaded(&chapter.id) {
                continue;
            }
            match self.load_one(&chapter.id).await {
                Ok(()) => tracing::debug!("Loaded {}", chapter.id),
                Err(e) => tracing::warn!("Skipping {}: {}", chapter.id, e),
            }
        }
    }

    async fn load_one(&self, id: &str) -> Result<()> {
        let html = self.fetcher.fetch(id).await?;
        let region = self.extractor.extract(&html)?;
        self.store.insert(id, region.text);
        Ok(())
    }
}
