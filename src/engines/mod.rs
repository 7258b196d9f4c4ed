//! Search engine implementations and the configuration-driven registry.

mod api;
mod static_engine;
mod wikipedia;

use std::sync::Arc;

use reqwest::Client;

use crate::config::{EngineKind, EngineSpec};
use crate::Engine;
use crate::Result;

pub use api::{querify, ApiEngine};
pub use static_engine::StaticEngine;
pub use wikipedia::Wikipedia;

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; metasearch/", env!("CARGO_PKG_VERSION"), ")");

/// Builds the HTTP client shared by network-backed engines.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Instantiates the configured engines in declaration order.
pub fn build_engines(specs: &[EngineSpec]) -> Result<Vec<Arc<dyn Engine>>> {
    let client = http_client()?;
    Ok(specs
        .iter()
        .map(|spec| -> Arc<dyn Engine> {
            let config = spec.config.clone();
            match &spec.kind {
                EngineKind::Api { base_url } => {
                    Arc::new(ApiEngine::new(config, client.clone(), base_url.clone()))
                }
                EngineKind::Wikipedia { language } => {
                    Arc::new(Wikipedia::new(config, client.clone()).with_language(language.clone()))
                }
                EngineKind::Static { results } => Arc::new(StaticEngine::new(config, results.clone())),
            }
        })
        .collect())
}
