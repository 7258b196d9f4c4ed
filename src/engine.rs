//! Search engine trait and configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchResult};

/// Static description of a search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unique identifier (e.g., "wiki"). Used as the cache key and in
    /// persisted preferences.
    pub id: String,
    /// Display name of the engine.
    pub name: String,
    /// Whether the engine's snippets are unusually large. Layout only.
    #[serde(default)]
    pub snippet_large: bool,
}

impl EngineConfig {
    /// Creates a configuration with the given id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            snippet_large: false,
        }
    }

    /// Marks the engine's snippets as large.
    pub fn with_large_snippets(mut self) -> Self {
        self.snippet_large = true;
        self
    }
}

/// Trait for implementing search engines.
///
/// An engine takes an already-normalized query and returns its results.
/// Engines must return an empty list rather than an error when nothing
/// matches; errors are reserved for genuine failures.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine configuration.
    fn config(&self) -> &EngineConfig;

    /// Performs a search and returns results.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Returns the engine id.
    fn id(&self) -> &str {
        &self.config().id
    }

    /// Returns the engine display name.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Returns whether the engine produces large snippets.
    fn is_snippet_large(&self) -> bool {
        self.config().snippet_large
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedEngine {
        config: EngineConfig,
    }

    #[async_trait]
    impl Engine for NamedEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_engine_config_new() {
        let config = EngineConfig::new("wiki", "Wikipedia");
        assert_eq!(config.id, "wiki");
        assert_eq!(config.name, "Wikipedia");
        assert!(!config.snippet_large);
    }

    #[test]
    fn test_engine_config_large_snippets() {
        let config = EngineConfig::new("so", "Stack Overflow").with_large_snippets();
        assert!(config.snippet_large);
    }

    #[test]
    fn test_engine_config_deserialization_defaults() {
        let json = r#"{"id":"docs","name":"Docs"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, EngineConfig::new("docs", "Docs"));
    }

    #[test]
    fn test_engine_default_accessors() {
        let engine = NamedEngine {
            config: EngineConfig::new("wiki", "Wikipedia").with_large_snippets(),
        };
        assert_eq!(engine.id(), "wiki");
        assert_eq!(engine.name(), "Wikipedia");
        assert!(engine.is_snippet_large());
    }

    #[tokio::test]
    async fn test_engine_search_empty() {
        let engine = NamedEngine {
            config: EngineConfig::new("empty", "Empty"),
        };
        assert!(engine.search("anything").await.unwrap().is_empty());
    }
}
