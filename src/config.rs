//! Application configuration.
//!
//! Configuration is a JSON document:
//!
//! ```json
//! {
//!   "engines": [
//!     { "id": "wiki", "name": "Wikipedia", "kind": "wikipedia", "snippet_large": true },
//!     { "id": "docs", "name": "Docs", "kind": "api", "base_url": "http://localhost:3000" }
//!   ],
//!   "footer": "<a href=\"/about\">About</a>",
//!   "tracking_id": "UA-000000-1",
//!   "data_dir": "/var/lib/metasearch"
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EngineConfig, Result, SearchError, SearchResult};

/// How an engine fetches its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineKind {
    /// Calls `GET {base_url}/api/search`.
    Api {
        /// Base URL of the search endpoint.
        base_url: String,
    },
    /// Queries the MediaWiki search API.
    Wikipedia {
        /// Wikipedia language subdomain.
        #[serde(default = "default_language")]
        language: String,
    },
    /// Always returns the given results.
    Static {
        /// Fixed results.
        #[serde(default)]
        results: Vec<SearchResult>,
    },
}

fn default_language() -> String {
    "en".to_string()
}

/// One configured engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Id, display name and layout flags.
    #[serde(flatten)]
    pub config: EngineConfig,
    /// Adapter selection and its settings.
    #[serde(flatten)]
    pub kind: EngineKind,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engines in declaration order.
    #[serde(default)]
    pub engines: Vec<EngineSpec>,
    /// HTML shown under the results.
    #[serde(default)]
    pub footer: Option<String>,
    /// Analytics id; page views are reported only when set.
    #[serde(default)]
    pub tracking_id: Option<String>,
    /// Directory holding persisted preferences.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Parses and validates a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Configuration used when no file is given: English Wikipedia only.
    pub fn builtin() -> Self {
        Self {
            engines: vec![EngineSpec {
                config: EngineConfig::new("wikipedia", "Wikipedia").with_large_snippets(),
                kind: EngineKind::Wikipedia {
                    language: default_language(),
                },
            }],
            ..Default::default()
        }
    }

    /// Checks that at least one engine is configured and ids are unique.
    pub fn validate(&self) -> Result<()> {
        if self.engines.is_empty() {
            return Err(SearchError::Config("no engines configured".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in &self.engines {
            if spec.config.id.is_empty() {
                return Err(SearchError::Config("engine id must not be empty".to_string()));
            }
            if !seen.insert(spec.config.id.as_str()) {
                return Err(SearchError::Config(format!(
                    "duplicate engine id '{}'",
                    spec.config.id
                )));
            }
        }
        Ok(())
    }

    /// Returns the preference directory, defaulting to the platform config
    /// directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("metasearch")
        })
    }

    /// Returns the configured engine entry by id.
    pub fn engine(&self, id: &str) -> Result<&EngineSpec> {
        self.engines
            .iter()
            .find(|spec| spec.config.id == id)
            .ok_or_else(|| SearchError::UnknownEngine(id.to_string()))
    }
}
