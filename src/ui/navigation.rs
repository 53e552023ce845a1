use crate::core::config::SearchSettings;
use crate::core::error::Result;
use crate::indexing::extract::Extractor;
use crate::search::engine::find_case_insensitive;
use crate::storage::handoff::{HandoffState, HandoffStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Performs the full page navigation after the handoff is stored
pub trait Navigator {
    fn navigate(&self, target_id: &str) -> Result<Url>;
}

/// Resolves targets relative to the page currently open
pub struct SiteNavigator {
    current: Url,
}

impl SiteNavigator {
    pub fn new(current: Url) -> Self {
        Self { current }
    }
}

impl Navigator for SiteNavigator {
    fn navigate(&self, target_id: &str) -> Result<Url> {
        Ok(self.current.join(target_id)?)
    }
}

/// The rendered destination page, seen as text leaves in document order
pub trait PageSurface: Send + Sync {
    fn text_leaves(&self) -> Vec<String>;
    fn scroll_into_view(&self, leaf: usize);
    fn set_emphasis(&self, leaf: usize, on: bool);
}

/// What a resume attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// No query was waiting for this page
    NotPending,
    /// The query is not literally present in any single text leaf
    Miss,
    /// Scrolled to `leaf`; the match starts at character `offset` within it
    Found { leaf: usize, offset: usize },
}

/// Carries the active query across a full page navigation
pub struct NavigationHandoff {
    store: HandoffStore,
    settle: Duration,
    emphasis: Duration,
}

impl NavigationHandoff {
    pub fn new(store: HandoffStore, settings: &SearchSettings) -> Self {
        Self {
            store,
            settle: settings.settle(),
            emphasis: settings.emphasis(),
        }
    }

    /// Remember `query`, then navigate to `target_id`
    pub fn persist_and_navigate(
        &self,
        query: &str,
        target_id: &str,
        navigator: &dyn Navigator,
    ) -> Result<Url> {
        self.store.put(&HandoffState::pending(query))?;
        tracing::debug!("Stored handoff {:?} for {}", query, target_id);
        navigator.navigate(target_id)
    }

    /// Called once per page load. Clears the stored query before doing
    /// anything else, so a reload never scrolls twice.
    pub async fn resume_if_pending(&self, page: Arc<dyn PageSurface>) -> Result<HandoffOutcome> {
        let state = match self.store.take()? {
            Some(state) if state.pending => state,
            _ => return Ok(HandoffOutcome::NotPending),
        };

        tokio::time::sleep(self.settle).await;

        let leaves = page.text_leaves();
        let found = leaves.iter().enumerate().find_map(|(i, leaf)| {
            find_case_insensitive(leaf, &state.query_text).map(|offset| (i, offset))
        });

        let Some((leaf, offset)) = found else {
            tracing::debug!("Handoff query {:?} not found on page", state.query_text);
            return Ok(HandoffOutcome::Miss);
        };

        page.scroll_into_view(leaf);
        page.set_emphasis(leaf, true);

        let emphasis = self.emphasis;
        tokio::spawn(async move {
            tokio::time::sleep(emphasis).await;
            page.set_emphasis(leaf, false);
        });

        Ok(HandoffOutcome::Found { leaf, offset })
    }
}

/// What happened to a [`StaticPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Scrolled(usize),
    Emphasized(usize),
    Restored(usize),
}

/// A page surface over extracted HTML, recording scroll and emphasis calls
pub struct StaticPage {
    leaves: Vec<String>,
    events: Mutex<Vec<PageEvent>>,
}

impl StaticPage {
    pub fn new(leaves: Vec<String>) -> Self {
        Self {
            leaves,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn from_html(html: &str, extractor: &Extractor) -> Result<Self> {
        Ok(Self::new(extractor.extract(html)?.leaves))
    }

    pub fn leaf(&self, index: usize) -> Option<&str> {
        self.leaves.get(index).map(String::as_str)
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().clone()
    }

    /// Leaves currently carrying the emphasis
    pub fn emphasized(&self) -> Vec<usize> {
        let mut on = Vec::new();
        for event in self.events.lock().iter() {
            match event {
                PageEvent::Emphasized(i) => on.push(*i),
                PageEvent::Restored(i) => on.retain(|x| x != i),
                PageEvent::Scrolled(_) => {}
            }
        }
        on
    }
}

impl PageSurface for StaticPage {
    fn text_leaves(&self) -> Vec<String> {
        self.leaves.clone()
    }

    fn scroll_into_view(&self, leaf: usize) {
        self.events.lock().push(PageEvent::Scrolled(leaf));
    }

    fn set_emphasis(&self, leaf: usize, on: bool) {
        let event = if on {
            PageEvent::Emphasized(leaf)
        } else {
            PageEvent::Restored(leaf)
        };
        self.events.lock().push(event);
    }
}
