//! Address-bar and history synchronization.
//!
//! The `q` parameter of the current path is the source of truth for the
//! active search. [`NavigationSync`] replays it into the dispatcher on load
//! and after back/forward navigation, and decides whether a user
//! submission pushes a new history entry or replaces the current one.

use std::sync::{Mutex, PoisonError};

use tracing::debug;
use url::Url;

use crate::dispatcher::{Dispatcher, SearchHandle};

/// Base used to resolve relative paths when reading query parameters.
const BASE_URL: &str = "http://localhost/";

/// Name of the query parameter holding the search string.
pub const QUERY_PARAM: &str = "q";

/// Browser-like navigation surface.
pub trait History: Send + Sync {
    /// Adds a new entry and makes it current.
    fn push_state(&self, path: &str);

    /// Replaces the current entry.
    fn replace_state(&self, path: &str);

    /// Returns the path of the current entry.
    fn current_path(&self) -> String;

    /// Sets the document title.
    fn set_title(&self, title: &str);
}

/// Returns the path that represents a search for `query`.
pub fn search_path(query: &str) -> String {
    format!("/?{}={}", QUERY_PARAM, urlencoding::encode(query))
}

/// Reads the search string from a path. Missing or unparsable values
/// yield an empty string.
pub fn query_from_path(path: &str) -> String {
    Url::parse(BASE_URL)
        .and_then(|base| base.join(path))
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == QUERY_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

#[derive(Debug)]
struct Entries {
    paths: Vec<String>,
    cursor: usize,
    title: String,
}

/// In-process history stack with back/forward support.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Entries>,
}

impl MemoryHistory {
    /// Creates a history whose only entry is `initial_path`.
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                paths: vec![initial_path.into()],
                cursor: 0,
                title: String::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves one entry back. Returns the new current path, or `None` at the
    /// start of the stack.
    pub fn back(&self) -> Option<String> {
        let mut entries = self.lock();
        if entries.cursor == 0 {
            return None;
        }
        entries.cursor -= 1;
        Some(entries.paths[entries.cursor].clone())
    }

    /// Moves one entry forward. Returns the new current path, or `None` at
    /// the end of the stack.
    pub fn forward(&self) -> Option<String> {
        let mut entries = self.lock();
        if entries.cursor + 1 >= entries.paths.len() {
            return None;
        }
        entries.cursor += 1;
        Some(entries.paths[entries.cursor].clone())
    }

    /// Returns every entry, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().paths.clone()
    }

    /// Returns the document title.
    pub fn title(&self) -> String {
        self.lock().title.clone()
    }
}

impl History for MemoryHistory {
    fn push_state(&self, path: &str) {
        let mut entries = self.lock();
        let keep = entries.cursor + 1;
        entries.paths.truncate(keep);
        entries.paths.push(path.to_string());
        entries.cursor = keep;
        debug!("History push {}", path);
    }

    fn replace_state(&self, path: &str) {
        let mut entries = self.lock();
        let cursor = entries.cursor;
        entries.paths[cursor] = path.to_string();
        debug!("History replace {}", path);
    }

    fn current_path(&self) -> String {
        let entries = self.lock();
        entries.paths[entries.cursor].clone()
    }

    fn set_title(&self, title: &str) {
        self.lock().title = title.to_string();
    }
}

/// Keeps the visible query field, the address bar and the dispatcher in
/// step.
pub struct NavigationSync {
    dispatcher: Dispatcher,
    query: String,
}

impl NavigationSync {
    /// Wraps a dispatcher. The visible query starts empty.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            query: String::new(),
        }
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the visible query field.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Updates the visible query field without searching.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Runs the address-bar query on startup.
    pub fn load(&mut self) -> Option<SearchHandle> {
        self.run_address_query()
    }

    /// Runs the address-bar query after back/forward navigation.
    pub fn pop_state(&mut self) -> Option<SearchHandle> {
        self.run_address_query()
    }

    /// Submits the visible query.
    ///
    /// A new history entry is pushed only when the address bar already
    /// holds a non-empty query; from the empty landing page the current
    /// entry is replaced so "back" does not return to a blank page.
    pub fn submit(&mut self) -> Option<SearchHandle> {
        let address_query = query_from_path(&self.dispatcher.history().current_path());
        let new_entry = !address_query.trim().is_empty();
        self.dispatcher.search(&self.query, new_entry)
    }

    fn run_address_query(&mut self) -> Option<SearchHandle> {
        self.query = query_from_path(&self.dispatcher.history().current_path());
        self.dispatcher.search(&self.query, false)
    }
}
