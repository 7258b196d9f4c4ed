//! Error types for the metasearch library.

use thiserror::Error;

/// Result type alias for metasearch operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while configuring engines or running a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse an engine response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing local storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// No engine is registered under the given id.
    #[error("Unknown engine '{0}'")]
    UnknownEngine(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
