use async_trait::async_trait;
use chaptersearch::ui::presenter::RESTRICTED_NOTICE;
use chaptersearch::{
    ChapterDescriptor, ChapterRegistry, CurrentPage, DocumentFetcher, Error, QueryController, Result,
    SearchSession, SearchSettings, StatusLine,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// In-memory site; every fetch takes `delay` of (paused) tokio time
struct FakeSite {
    pages: HashMap<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentFetcher for FakeSite {
    async fn fetch(&self, id: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.pages
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("{}: HTTP 404 Not Found", id)))
    }
}

fn chapter_page(title: &str, prose: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body><nav>menu</nav>\
         <article><h1>{title}</h1><p>{prose}</p>\
         <div class=\"quiz-container\"><p>Quiz about GDP</p></div></article></body></html>"
    )
}

fn registry() -> ChapterRegistry {
    ChapterRegistry::new(vec![
        ChapterDescriptor::new("ch1.html", "Chapter 1"),
        ChapterDescriptor::new("ch2.html", "Chapter 2"),
    ])
}

fn session(page_url: &str, delay: Duration) -> (Arc<SearchSession>, Arc<FakeSite>) {
    let site = Arc::new(FakeSite {
        pages: HashMap::from([(
            "ch2.html".to_string(),
            chapter_page("Chapter 2", "GDP per capita rose"),
        )]),
        delay,
        calls: AtomicUsize::new(0),
    });
    let current = CurrentPage::new(
        Url::parse(page_url).unwrap(),
        chapter_page("Chapter 1", "GDP growth is strong"),
    );
    let session = SearchSession::new(registry(), current, site.clone(), SearchSettings::default());
    (Arc::new(session), site)
}

#[tokio::test]
async fn test_networked_search_covers_every_chapter() {
    let (session, site) = session("https://site.test/ch1.html", Duration::ZERO);

    let view = session.run_query("GDP").await;
    assert_eq!(view.status, StatusLine::Count(2));
    assert!(view.notice.is_none());
    assert_eq!(view.entries[0].document_id, "ch1.html");
    assert_eq!(view.entries[1].document_id, "ch2.html");

    let html = view.to_html();
    assert!(html.contains("<mark>GDP</mark> growth is strong"));
    assert!(html.contains("<mark>GDP</mark> per capita rose"));
    assert!(!html.contains("Quiz"));
    assert_eq!(site.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_local_file_search_is_restricted() {
    let (session, site) = session("file:///site/ch1.html", Duration::ZERO);

    let view = session.run_query("GDP").await;
    assert_eq!(view.status, StatusLine::Count(1));
    assert_eq!(view.entries[0].document_id, "ch1.html");
    assert_eq!(view.notice.as_deref(), Some(RESTRICTED_NOTICE));
    assert!(view.to_html().contains("search-notice"));
    assert_eq!(site.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_results_state() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::ZERO);

    let view = session.run_query("arbejdsløshed").await;
    assert!(view.entries.is_empty());
    assert_eq!(view.status.to_string(), "No results for \"arbejdsløshed\"");
}

#[tokio::test]
async fn test_short_query_never_loads() {
    let (session, site) = session("https://site.test/ch1.html", Duration::ZERO);

    for query in ["", "G", "GD", "  GD  "] {
        let view = session.run_query(query).await;
        assert_eq!(view.status, StatusLine::Prompt { min_chars: 3 });
        assert!(view.entries.is_empty());
    }
    assert_eq!(session.loader().load_attempts(), 0);
    assert_eq!(site.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_queries_share_one_load() {
    let (session, site) = session("https://site.test/ch1.html", Duration::from_millis(5));

    let (a, b) = tokio::join!(session.run_query("GDP"), session.run_query("capita"));
    assert_eq!(a.status, StatusLine::Count(2));
    assert_eq!(b.status, StatusLine::Count(1));
    assert_eq!(session.loader().load_attempts(), 1);
    assert_eq!(site.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_controller_debounces_bursts() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::ZERO);
    let controller = QueryController::new(session.clone());

    controller.on_input("gro");
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.on_input("grow");
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.on_input("growth");

    // 250ms after the last keystroke; the earlier timers never fired
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(matches!(controller.current_view().status, StatusLine::Prompt { .. }));
    assert_eq!(session.loader().load_attempts(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = controller.current_view();
    assert_eq!(view.query, "growth");
    assert_eq!(view.status, StatusLine::Count(1));
}

#[tokio::test(start_paused = true)]
async fn test_controller_searches_during_load_share_one_pass() {
    let (session, site) = session("https://site.test/ch1.html", Duration::from_millis(500));
    let controller = QueryController::new(session.clone());
    let mut views = controller.subscribe();

    controller.on_input("GDP");
    // First search leaves its timer at 300ms and starts loading
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(controller.current_view().status, StatusLine::Loading);
    assert!(session.loader().state().is_loading);

    controller.on_input("capita");
    let view = views
        .wait_for(|v| v.query == "capita" && matches!(v.status, StatusLine::Count(_)))
        .await
        .unwrap()
        .clone();

    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.entries[0].document_id, "ch2.html");
    assert_eq!(session.loader().load_attempts(), 1);
    assert_eq!(site.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_input_shows_prompt_and_cancels_pending() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::ZERO);
    let controller = QueryController::new(session.clone());

    controller.on_input("GDP");
    controller.on_input("GD");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(controller.current_view().status, StatusLine::Prompt { min_chars: 3 });
    assert_eq!(session.loader().load_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_open_preloads_and_escape_clears() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::from_millis(10));
    let controller = QueryController::new(session.clone());

    controller.open();
    assert!(controller.is_open());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.loader().state().is_complete);

    controller.on_input("GDP");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(controller.current_view().status, StatusLine::Count(2));
    assert_eq!(session.loader().load_attempts(), 1);

    controller.escape();
    assert!(!controller.is_open());
    assert!(controller.current_view().entries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_search() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::ZERO);
    let controller = QueryController::new(session.clone());

    controller.open();
    controller.on_input("GDP");
    controller.close();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(matches!(controller.current_view().status, StatusLine::Prompt { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_last_input_settles_before_shutdown() {
    let (session, _site) = session("https://site.test/ch1.html", Duration::from_millis(20));
    let controller = QueryController::new(session.clone());
    let mut views = controller.subscribe();

    controller.open();
    controller.on_input("GDP");
    controller.wait_settled("GDP").await;
    assert_eq!(controller.current_view().status, StatusLine::Count(2));

    // Once the controller is gone the channel closes after the final view
    drop(controller);
    while views.changed().await.is_ok() {}
    assert_eq!(views.borrow().query, "GDP");
    assert_eq!(views.borrow().status, StatusLine::Count(2));
}
