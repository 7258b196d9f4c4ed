//! Search result types.

use serde::{Deserialize, Serialize};

/// A single result returned by an engine.
///
/// `title` and `snippet` carry HTML-safe markup; highlighting injects
/// `<mark>` elements into them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title (HTML).
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Result description (HTML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Last modification date as a Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
}

impl SearchResult {
    /// Creates a new search result without snippet or modification date.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: None,
            modified: None,
        }
    }

    /// Sets the snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Sets the last modification timestamp.
    pub fn with_modified(mut self, modified: i64) -> Self {
        self.modified = Some(modified);
        self
    }
}

/// One engine's complete response to one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    /// Id of the engine that produced the results.
    pub engine_id: String,
    /// Time between dispatch and completion.
    pub elapsed_ms: u64,
    /// Results in engine order.
    pub results: Vec<SearchResult>,
    /// Failure message when the engine call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultGroup {
    /// Creates a group for a successful engine call.
    pub fn new(engine_id: impl Into<String>, elapsed_ms: u64, results: Vec<SearchResult>) -> Self {
        Self {
            engine_id: engine_id.into(),
            elapsed_ms,
            results,
            error: None,
        }
    }

    /// Creates an empty group recording an engine failure.
    pub fn failed(engine_id: impl Into<String>, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            engine_id: engine_id.into(),
            elapsed_ms,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Returns whether the engine call failed.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns whether the group holds no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_new() {
        let result = SearchResult::new("https://example.com", "Title");
        assert_eq!(result.url, "https://example.com");
        assert_eq!(result.title, "Title");
        assert!(result.snippet.is_none());
        assert!(result.modified.is_none());
    }

    #[test]
    fn test_search_result_builders() {
        let result = SearchResult::new("url", "title")
            .with_snippet("<b>snippet</b>")
            .with_modified(1_593_668_572);
        assert_eq!(result.snippet.as_deref(), Some("<b>snippet</b>"));
        assert_eq!(result.modified, Some(1_593_668_572));
    }

    #[test]
    fn test_search_result_deserialize_minimal() {
        let json = r#"{"title":"Rust","url":"https://rust-lang.org"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result, SearchResult::new("https://rust-lang.org", "Rust"));
    }

    #[test]
    fn test_search_result_deserialize_full() {
        let json = r#"{"title":"Rust","url":"u","snippet":"s","modified":1600000000}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.snippet.as_deref(), Some("s"));
        assert_eq!(result.modified, Some(1_600_000_000));
    }

    #[test]
    fn test_search_result_serialization_skips_missing() {
        let json = serde_json::to_string(&SearchResult::new("u", "t")).unwrap();
        assert_eq!(json, r#"{"title":"t","url":"u"}"#);
    }

    #[test]
    fn test_result_group_new() {
        let group = ResultGroup::new("wiki", 42, vec![SearchResult::new("u", "t")]);
        assert_eq!(group.engine_id, "wiki");
        assert_eq!(group.elapsed_ms, 42);
        assert_eq!(group.len(), 1);
        assert!(!group.is_failed());
    }

    #[test]
    fn test_result_group_failed() {
        let group = ResultGroup::failed("docs", 7, "HTTP request failed");
        assert!(group.is_failed());
        assert!(group.is_empty());
        assert_eq!(group.error.as_deref(), Some("HTTP request failed"));
    }

    #[test]
    fn test_result_group_serialization_camel_case() {
        let group = ResultGroup::new("wiki", 10, vec![]);
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, r#"{"engineId":"wiki","elapsedMs":10,"results":[]}"#);
    }
}
