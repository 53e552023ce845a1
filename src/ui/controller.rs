use crate::session::SearchSession;
use crate::ui::presenter::{ResultsView, StatusLine};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Turns raw keystrokes into debounced searches.
///
/// Each input restarts the quiet window; only the last input of a burst
/// searches. Cancelling affects the timer alone: once a search has left the
/// timer it runs to completion, though its view is dropped if newer input
/// arrived meanwhile.
pub struct QueryController {
    session: Arc<SearchSession>,
    views: Arc<watch::Sender<ResultsView>>,
    pending: Arc<Mutex<Option<CancellationToken>>>,
    open: AtomicBool,
}

impl QueryController {
    pub fn new(session: Arc<SearchSession>) -> Self {
        let (views, _) = watch::channel(ResultsView::prompt(session.settings().min_query_chars));
        Self {
            session,
            views: Arc::new(views),
            pending: Arc::new(Mutex::new(None)),
            open: AtomicBool::new(false),
        }
    }

    /// Receiver for the rendering side; always holds the latest view
    pub fn subscribe(&self) -> watch::Receiver<ResultsView> {
        self.views.subscribe()
    }

    pub fn current_view(&self) -> ResultsView {
        self.views.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Search modal opened: start loading in the background
    pub fn open(&self) {
        if self.open.swap(true, Ordering::SeqCst) {
            return;
        }
        let loader = self.session.loader().clone();
        if !loader.state().is_complete {
            tokio::spawn(async move {
                loader.load().await;
            });
        }
    }

    /// Search modal closed: drop any pending search and reset the view
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.cancel_pending();
        self.views
            .send_replace(ResultsView::prompt(self.session.settings().min_query_chars));
    }

    /// Global escape key; closes the modal when it is open
    pub fn escape(&self) {
        if self.is_open() {
            self.close();
        }
    }

    /// Handle one input change. Fire-and-forget: the search runs on a spawned task.
    pub fn on_input(&self, raw: &str) {
        let token = CancellationToken::new();
        self.replace_pending(Some(token.clone()));

        let query = raw.trim().to_string();
        if !self.session.accepts(&query) {
            self.views
                .send_replace(ResultsView::prompt(self.session.settings().min_query_chars));
            return;
        }

        let session = self.session.clone();
        let views = self.views.clone();
        let pending = self.pending.clone();
        let delay = session.settings().debounce();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if !session.loader().state().is_complete {
                publish_unless_cancelled(&pending, &token, &views, ResultsView::loading(&query));
            }

            let view = session.run_query(&query).await;
            if !publish_unless_cancelled(&pending, &token, &views, view) {
                tracing::debug!("Discarding results for superseded query {:?}", query);
            }
        });
    }

    /// Wait until the search for `raw` published its final view.
    /// Only meaningful for the latest input; a superseded query never settles.
    pub async fn wait_settled(&self, raw: &str) {
        let query = raw.trim();
        if !self.session.accepts(query) {
            return;
        }
        let mut views = self.views.subscribe();
        let _ = views
            .wait_for(|v| v.query == query && v.status != StatusLine::Loading)
            .await;
    }

    fn cancel_pending(&self) {
        self.replace_pending(None);
    }

    fn replace_pending(&self, next: Option<CancellationToken>) {
        let mut pending = self.pending.lock();
        if let Some(previous) = std::mem::replace(&mut *pending, next) {
            previous.cancel();
        }
    }
}

/// Send `view` unless `token` was superseded. Cancelling happens under the
/// same lock, so newer input can never slip in between check and send.
fn publish_unless_cancelled(
    pending: &Mutex<Option<CancellationToken>>,
    token: &CancellationToken,
    views: &watch::Sender<ResultsView>,
    view: ResultsView,
) -> bool {
    let _pending = pending.lock();
    if token.is_cancelled() {
        return false;
    }
    views.send_replace(view);
    true
}
