//! Wikipedia search engine implementation.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::highlight::escape_text;
use crate::{Engine, EngineConfig, Result, SearchResult};

/// Wikipedia search engine using the MediaWiki API.
///
/// Snippets are kept as the HTML the API returns, including its
/// `searchmatch` spans.
pub struct Wikipedia {
    config: EngineConfig,
    client: Client,
    language: String,
}

impl Wikipedia {
    /// Creates a Wikipedia engine with the given configuration.
    pub fn new(config: EngineConfig, client: Client) -> Self {
        Self {
            config,
            client,
            language: "en".to_string(),
        }
    }

    /// Sets the Wikipedia language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Returns the Wikipedia language.
    pub fn language(&self) -> &str {
        &self.language
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "https://{}.wikipedia.org/w/api.php?action=query&list=search&srsearch={}&srprop=snippet|timestamp&format=json&srlimit=10",
            self.language,
            urlencoding::encode(query)
        )
    }

    fn to_result(&self, item: WikiSearchResult) -> SearchResult {
        let url = format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            urlencoding::encode(&item.title.replace(' ', "_"))
        );
        let mut title = String::with_capacity(item.title.len());
        escape_text(&item.title, &mut title);

        let mut result = SearchResult::new(url, title);
        if !item.snippet.is_empty() {
            result = result.with_snippet(item.snippet);
        }
        if let Some(modified) = item
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        {
            result = result.with_modified(modified.timestamp());
        }
        result
    }
}

#[derive(Deserialize)]
struct WikiResponse {
    query: Option<WikiQuery>,
}

#[derive(Deserialize)]
struct WikiQuery {
    search: Vec<WikiSearchResult>,
}

#[derive(Deserialize)]
struct WikiSearchResult {
    title: String,
    #[serde(default)]
    snippet: String,
    timestamp: Option<String>,
}

#[async_trait]
impl Engine for Wikipedia {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(self.search_url(query))
            .send()
            .await?
            .error_for_status()?;
        let wiki_response: WikiResponse = response.json().await?;

        Ok(wiki_response
            .query
            .map(|q| q.search.into_iter().map(|item| self.to_result(item)).collect())
            .unwrap_or_default())
    }
}
