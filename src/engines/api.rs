//! Engine backed by a metasearch `/api/search` endpoint.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::{Engine, EngineConfig, Result, SearchResult};

/// Engine that forwards queries to `GET {base_url}/api/search`.
///
/// The endpoint answers with a JSON array of results for the requested
/// engine id.
pub struct ApiEngine {
    config: EngineConfig,
    client: Client,
    base_url: String,
}

impl ApiEngine {
    /// Creates an engine calling the endpoint under `base_url`.
    pub fn new(config: EngineConfig, client: Client, base_url: impl Into<String>) -> Self {
        Self {
            config,
            client,
            base_url: base_url.into(),
        }
    }

    /// Returns the endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, query: &str, timestamp_ms: i64) -> String {
        format!(
            "{}/api/search?{}",
            self.base_url.trim_end_matches('/'),
            querify(&[("engine", self.id()), ("q", query)], timestamp_ms)
        )
    }
}

/// Builds a query string from `params` plus a cache-busting `_` parameter.
///
/// Parameters are sorted by key and percent-encoded.
pub fn querify(params: &[(&str, &str)], timestamp_ms: i64) -> String {
    let timestamp = timestamp_ms.to_string();
    let mut pairs: Vec<(&str, &str)> = params.to_vec();
    pairs.push(("_", timestamp.as_str()));
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl Engine for ApiEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = self.search_url(query, Utc::now().timestamp_millis());
        let response = self.client.get(url).send().await?.error_for_status()?;
        let results: Vec<SearchResult> = response.json().await?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(base_url: &str) -> ApiEngine {
        ApiEngine::new(EngineConfig::new("docs", "Docs"), Client::new(), base_url)
    }

    #[test]
    fn test_querify_sorts_and_busts_cache() {
        let qs = querify(&[("q", "rust"), ("engine", "wiki")], 1_600_000_000_000);
        assert_eq!(qs, "_=1600000000000&engine=wiki&q=rust");
    }

    #[test]
    fn test_querify_encodes() {
        let qs = querify(&[("q", "a b&c")], 1);
        assert_eq!(qs, "_=1&q=a%20b%26c");
    }

    #[test]
    fn test_search_url() {
        let url = engine("http://localhost:3000/").search_url("foo bar", 42);
        assert_eq!(url, "http://localhost:3000/api/search?_=42&engine=docs&q=foo%20bar");
    }

    #[test]
    fn test_api_engine_accessors() {
        let engine = engine("http://localhost:3000");
        assert_eq!(engine.id(), "docs");
        assert_eq!(engine.name(), "Docs");
        assert_eq!(engine.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_search_unreachable_endpoint_fails() {
        let engine = engine("http://127.0.0.1:9");
        assert!(engine.search("rust").await.is_err());
    }
}
