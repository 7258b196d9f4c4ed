//! Query dispatch across all registered engines.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::navigation::{search_path, History};
use crate::state::{Action, AggregationState};
use crate::{Engine, Highlighter, ResultGroup};

/// Suffix of the page title while a search is displayed.
pub const TITLE_SUFFIX: &str = " - Metasearch";

/// Receives a page-view event for every dispatched search.
pub trait Tracker: Send + Sync {
    /// Records a page view for `path`.
    fn page_view(&self, path: &str);
}

/// Tracker that reports page views through `tracing`.
#[derive(Debug, Clone)]
pub struct LogTracker {
    tracking_id: String,
}

impl LogTracker {
    /// Creates a tracker for the given tracking id.
    pub fn new(tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_id: tracking_id.into(),
        }
    }
}

impl Tracker for LogTracker {
    fn page_view(&self, path: &str) {
        info!(tracking_id = %self.tracking_id, page_path = %path, "page view");
    }
}

/// Trims a query and collapses whitespace runs into single spaces.
///
/// Returns `None` when the result holds no word character.
pub fn normalize_query(query: &str) -> Option<String> {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().any(|c| c == '_' || c.is_alphanumeric()) {
        Some(normalized)
    } else {
        None
    }
}

/// Handle to the engine tasks of one dispatched search.
pub struct SearchHandle {
    generation: u64,
    query: String,
    tasks: Vec<JoinHandle<()>>,
}

impl SearchHandle {
    /// Returns the generation the search was tagged with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the normalized query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Waits until every engine of this search has reported.
    pub async fn finished(self) {
        for outcome in join_all(self.tasks).await {
            if let Err(e) = outcome {
                warn!("Engine task for {:?} aborted: {}", self.query, e);
            }
        }
    }

    /// Calls `on_group` for each group of this search as it lands, in
    /// completion order.
    ///
    /// Returns once every engine task has ended, including tasks that
    /// panicked before reporting. Nothing is reported once a newer search
    /// has reset the state.
    pub async fn follow<F>(self, mut updates: watch::Receiver<AggregationState>, mut on_group: F)
    where
        F: FnMut(&ResultGroup),
    {
        let generation = self.generation;
        let expected = self.tasks.len();
        let mut seen = 0;

        let finished = self.finished();
        tokio::pin!(finished);
        let mut done = false;
        while !done && seen < expected {
            tokio::select! {
                _ = &mut finished => done = true,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    seen = report_new_groups(&state, generation, seen, &mut on_group);
                }
            }
        }
        if !done {
            finished.await;
        }

        let state = updates.borrow_and_update().clone();
        report_new_groups(&state, generation, seen, &mut on_group);
    }
}

fn report_new_groups<F>(
    state: &AggregationState,
    generation: u64,
    seen: usize,
    on_group: &mut F,
) -> usize
where
    F: FnMut(&ResultGroup),
{
    if state.generation() != generation {
        return seen;
    }
    for group in state.groups().iter().skip(seen) {
        on_group(group);
    }
    state.len().max(seen)
}

/// Fans a query out to every engine and feeds the aggregation state.
pub struct Dispatcher {
    engines: Vec<Arc<dyn Engine>>,
    cache: Arc<ResultCache>,
    state: Arc<watch::Sender<AggregationState>>,
    history: Arc<dyn History>,
    tracker: Option<Arc<dyn Tracker>>,
}

impl Dispatcher {
    /// Creates a dispatcher with a fresh cache and empty state.
    pub fn new(engines: Vec<Arc<dyn Engine>>, history: Arc<dyn History>) -> Self {
        let (state, _) = watch::channel(AggregationState::new());
        Self {
            engines,
            cache: Arc::new(ResultCache::new()),
            state: Arc::new(state),
            history,
            tracker: None,
        }
    }

    /// Uses the given cache instead of a private one.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the page-view tracker.
    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Returns the registered engines in declaration order.
    pub fn engines(&self) -> &[Arc<dyn Engine>] {
        &self.engines
    }

    /// Returns the navigation history the dispatcher writes to.
    pub fn history(&self) -> &Arc<dyn History> {
        &self.history
    }

    /// Returns the shared result cache.
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Subscribes to aggregation state changes.
    pub fn subscribe(&self) -> watch::Receiver<AggregationState> {
        self.state.subscribe()
    }

    /// Returns a copy of the current aggregation state.
    pub fn snapshot(&self) -> AggregationState {
        self.state.borrow().clone()
    }

    /// Starts a search.
    ///
    /// Queries without a word character are ignored and return `None`.
    /// Otherwise the navigation entry, tracker and page title are updated,
    /// the aggregation state is reset, and one task per engine is spawned.
    /// Must be called from within a Tokio runtime.
    pub fn search(&self, query: &str, new_entry: bool) -> Option<SearchHandle> {
        let query = normalize_query(query)?;

        let path = search_path(&query);
        if new_entry {
            self.history.push_state(&path);
        } else {
            self.history.replace_state(&path);
        }
        if let Some(tracker) = &self.tracker {
            tracker.page_view(&path);
        }
        self.history.set_title(&format!("{}{}", query, TITLE_SUFFIX));

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.reduce(Action::Reset);
            generation = state.generation();
        });
        debug!(
            "Dispatching {:?} to {} engines (generation {})",
            query,
            self.engines.len(),
            generation
        );

        let highlighter = Arc::new(Highlighter::new(&query));
        let tasks = self
            .engines
            .iter()
            .map(|engine| {
                tokio::spawn(run_engine(
                    Arc::clone(engine),
                    Arc::clone(&self.cache),
                    Arc::clone(&highlighter),
                    Arc::clone(&self.state),
                    generation,
                    query.clone(),
                ))
            })
            .collect();

        Some(SearchHandle {
            generation,
            query,
            tasks,
        })
    }
}

async fn run_engine(
    engine: Arc<dyn Engine>,
    cache: Arc<ResultCache>,
    highlighter: Arc<Highlighter>,
    state: Arc<watch::Sender<AggregationState>>,
    generation: u64,
    query: String,
) {
    let start = Instant::now();
    let outcome = cache.get(&engine, &query).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let group = match outcome {
        Ok(mut results) => {
            for result in &mut results {
                highlighter.highlight_result(result);
            }
            debug!("Engine {} returned {} results", engine.id(), results.len());
            ResultGroup::new(engine.id(), elapsed_ms, results)
        }
        Err(e) => {
            warn!("Engine {} failed: {}", engine.id(), e);
            ResultGroup::failed(engine.id(), elapsed_ms, e.to_string())
        }
    };

    state.send_if_modified(|state| state.reduce(Action::Append { generation, group }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MemoryHistory;
    use crate::{EngineConfig, Result, SearchError, SearchResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    struct MockEngine {
        config: EngineConfig,
        delay: Duration,
        results: Vec<SearchResult>,
        calls: AtomicUsize,
    }

    impl MockEngine {
        fn new(id: &str, delay_ms: u64, results: Vec<SearchResult>) -> Self {
            Self {
                config: EngineConfig::new(id, id),
                delay: Duration::from_millis(delay_ms),
                results,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Engine for MockEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            Ok(self.results.clone())
        }
    }

    /// Echoes the query back as the title of a single result.
    struct EchoEngine {
        config: EngineConfig,
        delay: Duration,
    }

    #[async_trait]
    impl Engine for EchoEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
            sleep(self.delay).await;
            Ok(vec![SearchResult::new("https://example.com", query)])
        }
    }

    struct FailingEngine {
        config: EngineConfig,
    }

    #[async_trait]
    impl Engine for FailingEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            Err(SearchError::Other("Engine failed".to_string()))
        }
    }

    struct PanickingEngine {
        config: EngineConfig,
    }

    #[async_trait]
    impl Engine for PanickingEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            panic!("engine crashed");
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        paths: Mutex<Vec<String>>,
    }

    impl Tracker for RecordingTracker {
        fn page_view(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_string());
        }
    }

    fn dispatcher(engines: Vec<Arc<dyn Engine>>) -> (Dispatcher, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::new("/"));
        (Dispatcher::new(engines, history.clone()), history)
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  foo   bar \t baz "), Some("foo bar baz".to_string()));
        assert_eq!(normalize_query("rust"), Some("rust".to_string()));
        assert_eq!(normalize_query("_"), Some("_".to_string()));
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query(" \t\n "), None);
        assert_eq!(normalize_query("?! -- ."), None);
    }

    #[tokio::test]
    async fn test_search_ignores_query_without_words() {
        let engine = Arc::new(MockEngine::new("wiki", 0, vec![]));
        let (dispatcher, history) = dispatcher(vec![engine.clone() as Arc<dyn Engine>]);
        let rx = dispatcher.subscribe();

        assert!(dispatcher.search("   ", true).is_none());
        assert!(dispatcher.search("?!", false).is_none());

        assert_eq!(history.entries(), vec!["/".to_string()]);
        assert_eq!(history.title(), "");
        assert_eq!(dispatcher.snapshot().generation(), 0);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_groups_in_completion_order() {
        let wiki: Arc<dyn Engine> = Arc::new(MockEngine::new(
            "wiki",
            50,
            vec![SearchResult::new("https://example.com/foo", "Foo Bar Baz")],
        ));
        let docs: Arc<dyn Engine> = Arc::new(MockEngine::new("docs", 10, vec![]));
        let (dispatcher, _) = dispatcher(vec![wiki, docs]);

        let handle = dispatcher.search("foo bar", true).unwrap();
        handle.finished().await;

        let state = dispatcher.snapshot();
        let groups = state.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].engine_id, "docs");
        assert!(groups[0].results.is_empty());
        assert!(!groups[0].is_failed());
        assert_eq!(groups[1].engine_id, "wiki");
        assert_eq!(
            groups[1].results[0].title,
            "<mark>Foo</mark> <mark>Bar</mark> Baz"
        );
        assert!(groups[0].elapsed_ms >= 10);
        assert!(groups[1].elapsed_ms >= 50);
    }

    #[tokio::test]
    async fn test_search_updates_navigation_and_title() {
        let (dispatcher, history) = dispatcher(vec![]);

        dispatcher.search("  foo   bar ", true).unwrap().finished().await;
        assert_eq!(history.entries(), vec!["/".to_string(), "/?q=foo%20bar".to_string()]);
        assert_eq!(history.title(), "foo bar - Metasearch");

        dispatcher.search("baz", false).unwrap().finished().await;
        assert_eq!(history.entries(), vec!["/".to_string(), "/?q=baz".to_string()]);
        assert_eq!(history.title(), "baz - Metasearch");
    }

    #[tokio::test]
    async fn test_search_reports_page_view() {
        let tracker = Arc::new(RecordingTracker::default());
        let history = Arc::new(MemoryHistory::new("/"));
        let dispatcher = Dispatcher::new(vec![], history).with_tracker(tracker.clone());

        dispatcher.search("rust", true).unwrap().finished().await;
        assert_eq!(*tracker.paths.lock().unwrap(), vec!["/?q=rust".to_string()]);
    }

    #[tokio::test]
    async fn test_search_surfaces_engine_failure() {
        let working: Arc<dyn Engine> = Arc::new(MockEngine::new(
            "working",
            0,
            vec![SearchResult::new("https://working.com", "Working")],
        ));
        let failing: Arc<dyn Engine> = Arc::new(FailingEngine {
            config: EngineConfig::new("failing", "Failing"),
        });
        let (dispatcher, _) = dispatcher(vec![working, failing]);

        dispatcher.search("test", true).unwrap().finished().await;

        let state = dispatcher.snapshot();
        assert_eq!(state.len(), 2);
        let failed = state.group("failing").unwrap();
        assert!(failed.is_failed());
        assert!(failed.results.is_empty());
        let ok = state.group("working").unwrap();
        assert_eq!(ok.results.len(), 1);
        assert!(!ok.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_discards_superseded_generation() {
        let engine: Arc<dyn Engine> = Arc::new(EchoEngine {
            config: EngineConfig::new("echo", "Echo"),
            delay: Duration::from_millis(100),
        });
        let (dispatcher, _) = dispatcher(vec![engine]);

        let first = dispatcher.search("first", true).unwrap();
        let second = dispatcher.search("second", true).unwrap();
        let current = second.generation();
        assert_eq!(first.generation() + 1, current);

        first.finished().await;
        second.finished().await;

        let state = dispatcher.snapshot();
        assert_eq!(state.generation(), current);
        assert_eq!(state.len(), 1);
        assert_eq!(state.groups()[0].results[0].title, "<mark>second</mark>");
    }

    #[tokio::test]
    async fn test_search_uses_cache_for_repeated_query() {
        let engine = Arc::new(MockEngine::new(
            "wiki",
            0,
            vec![SearchResult::new("https://example.com", "Rust")],
        ));
        let (dispatcher, _) = dispatcher(vec![engine.clone() as Arc<dyn Engine>]);

        dispatcher.search("rust", true).unwrap().finished().await;
        dispatcher.search("  rust ", false).unwrap().finished().await;

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        let state = dispatcher.snapshot();
        assert_eq!(state.groups()[0].results[0].title, "<mark>Rust</mark>");
    }

    #[tokio::test]
    async fn test_search_notifies_subscribers() {
        let engine: Arc<dyn Engine> = Arc::new(MockEngine::new("wiki", 0, vec![]));
        let (dispatcher, _) = dispatcher(vec![engine]);
        let mut rx = dispatcher.subscribe();

        let handle = dispatcher.search("rust", true).unwrap();
        handle.finished().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.generation(), 1);
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn test_search_handle_accessors() {
        let (dispatcher, _) = dispatcher(vec![]);
        let handle = dispatcher.search(" a  b ", true).unwrap();
        assert_eq!(handle.query(), "a b");
        assert_eq!(handle.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_reports_groups_in_completion_order() {
        let slow = Arc::new(MockEngine::new("slow", 50, vec![]));
        let fast = Arc::new(MockEngine::new("fast", 10, vec![]));
        let (dispatcher, _) = dispatcher(vec![slow as Arc<dyn Engine>, fast as Arc<dyn Engine>]);
        let updates = dispatcher.subscribe();

        let handle = dispatcher.search("rust", true).unwrap();
        let mut seen = Vec::new();
        handle
            .follow(updates, |group| seen.push(group.engine_id.clone()))
            .await;

        assert_eq!(seen, vec!["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_returns_when_engine_task_panics() {
        let working = Arc::new(MockEngine::new(
            "working",
            10,
            vec![SearchResult::new("https://example.com", "Rust")],
        ));
        let crashing: Arc<dyn Engine> = Arc::new(PanickingEngine {
            config: EngineConfig::new("crashing", "Crashing"),
        });
        let (dispatcher, _) = dispatcher(vec![working as Arc<dyn Engine>, crashing]);
        let updates = dispatcher.subscribe();

        let handle = dispatcher.search("rust", true).unwrap();
        let mut seen = Vec::new();
        handle
            .follow(updates, |group| seen.push(group.engine_id.clone()))
            .await;

        assert_eq!(seen, vec!["working"]);
        assert_eq!(dispatcher.snapshot().len(), 1);
    }
}
