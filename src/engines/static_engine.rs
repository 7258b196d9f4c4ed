//! Engine with a fixed result list.

use async_trait::async_trait;

use crate::{Engine, EngineConfig, Result, SearchResult};

/// Returns the same results for every query. Useful for demos, offline
/// configurations and tests.
pub struct StaticEngine {
    config: EngineConfig,
    results: Vec<SearchResult>,
}

impl StaticEngine {
    /// Creates an engine that always answers with `results`.
    pub fn new(config: EngineConfig, results: Vec<SearchResult>) -> Self {
        Self { config, results }
    }
}

#[async_trait]
impl Engine for StaticEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.results.clone())
    }
}
