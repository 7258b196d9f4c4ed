//! Memoized engine lookups.
//!
//! The cache stores one shared future per `(engine id, query)` pair. The
//! first caller creates it; every later caller, including callers that
//! arrive while the engine call is still in flight, awaits the same
//! future. Outcomes are kept for the lifetime of the cache: there is no
//! eviction and failures are memoized as well.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::{Engine, SearchError, SearchResult};

/// Outcome of a memoized lookup. Errors are shared between callers.
pub type LookupResult = std::result::Result<Vec<SearchResult>, Arc<SearchError>>;

type Lookup = Shared<BoxFuture<'static, LookupResult>>;

/// Process-wide memo of engine results keyed by `(engine id, query)`.
#[derive(Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<(String, String), Lookup>>,
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the results of `engine` for `query`, invoking the engine only
    /// if this exact pair has never been requested before.
    ///
    /// Keys are compared verbatim; callers normalize queries beforehand.
    pub async fn get(&self, engine: &Arc<dyn Engine>, query: &str) -> LookupResult {
        let lookup = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry((engine.id().to_string(), query.to_string()))
                .or_insert_with(|| {
                    debug!("Cache miss for engine {} query {:?}", engine.id(), query);
                    let engine = Arc::clone(engine);
                    let query = query.to_string();
                    async move { engine.search(&query).await.map_err(Arc::new) }
                        .boxed()
                        .shared()
                })
                .clone()
        };
        lookup.await
    }

    /// Returns whether a lookup for the pair has been started.
    pub fn contains(&self, engine_id: &str, query: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(engine_id.to_string(), query.to_string()))
    }

    /// Returns the number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
