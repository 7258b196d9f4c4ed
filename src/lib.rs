//! # metasearch
//!
//! Client-side orchestration for a metasearch interface.
//!
//! A query is dispatched to every configured engine at once. Each engine's
//! results are memoized per `(engine id, query)`, highlighted against the
//! query, and appended to the aggregation state as a result group the
//! moment that engine answers. Groups are kept per engine, never merged
//! or re-ranked across engines.
//!
//! - Async parallel dispatch with independent completion
//! - Memoized engine lookups shared between concurrent callers
//! - Fuzzy, markup-preserving query highlighting
//! - Generation-tagged aggregation that drops superseded searches
//! - Persisted preferences and address-bar/history synchronization
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use metasearch::engines::build_engines;
//! use metasearch::{Config, Dispatcher, MemoryHistory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::builtin();
//!     let history = Arc::new(MemoryHistory::new("/"));
//!     let dispatcher = Dispatcher::new(build_engines(&config.engines)?, history);
//!
//!     if let Some(search) = dispatcher.search("rust programming", true) {
//!         search.finished().await;
//!     }
//!
//!     for group in dispatcher.snapshot().groups() {
//!         println!("{}: {} results", group.engine_id, group.results.len());
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod dispatcher;
mod engine;
mod error;
mod highlight;
mod navigation;
mod preferences;
mod result;
mod state;

pub mod engines;
pub mod present;

pub use cache::{LookupResult, ResultCache};
pub use config::{Config, EngineKind, EngineSpec};
pub use dispatcher::{normalize_query, Dispatcher, LogTracker, SearchHandle, Tracker};
pub use engine::{Engine, EngineConfig};
pub use error::{Result, SearchError};
pub use highlight::Highlighter;
pub use navigation::{query_from_path, search_path, History, MemoryHistory, NavigationSync};
pub use preferences::{
    FileBackend, MemoryBackend, PreferenceBackend, PreferenceStore, Preferences, STORAGE_KEY,
};
pub use result::{ResultGroup, SearchResult};
pub use state::{Action, AggregationState};
