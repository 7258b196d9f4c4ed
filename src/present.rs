//! Derived views the presentation layer draws from the aggregation state
//! and preferences.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use scraper::Html;
use serde::Serialize;

use crate::state::AggregationState;
use crate::{Engine, Preferences, ResultGroup};

/// Progress of one engine within the current search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EngineStatus {
    /// The engine has not reported yet.
    Searching,
    /// The engine reported zero results.
    NoResults,
    /// The engine reported results.
    Results(usize),
    /// The engine call failed.
    Failed(String),
}

impl EngineStatus {
    /// Derives the status from the engine's group, if any.
    pub fn from_group(group: Option<&ResultGroup>) -> Self {
        match group {
            None => Self::Searching,
            Some(group) => match &group.error {
                Some(error) => Self::Failed(error.clone()),
                None if group.is_empty() => Self::NoResults,
                None => Self::Results(group.len()),
            },
        }
    }

    /// Tooltip text for the sidebar entry.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Searching => "Searching...",
            Self::NoResults => "No results found",
            Self::Results(_) => "Jump to results",
            Self::Failed(_) => "Search failed",
        }
    }

    /// Result count, once the engine has reported.
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Searching => None,
            Self::NoResults | Self::Failed(_) => Some(0),
            Self::Results(n) => Some(*n),
        }
    }
}

/// One line of the engine sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarEntry {
    /// Engine id.
    pub engine_id: String,
    /// Display name.
    pub name: String,
    /// Progress within the current search.
    pub status: EngineStatus,
    /// Set when the engine has results and they are not hidden.
    pub has_results: bool,
}

/// Builds the sidebar, ordered by engine display name.
pub fn sidebar(
    engines: &[Arc<dyn Engine>],
    state: &AggregationState,
    preferences: &Preferences,
) -> Vec<SidebarEntry> {
    let mut entries: Vec<SidebarEntry> = engines
        .iter()
        .map(|engine| {
            let status = EngineStatus::from_group(state.group(engine.id()));
            let has_results =
                matches!(status, EngineStatus::Results(_)) && !preferences.is_hidden(engine.id());
            SidebarEntry {
                engine_id: engine.id().to_string(),
                name: engine.name().to_string(),
                status,
                has_results,
            }
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Groups drawn in the results column: those with at least one result, in
/// completion order.
pub fn visible_groups(state: &AggregationState) -> impl Iterator<Item = &ResultGroup> {
    state.groups().iter().filter(|group| !group.is_empty())
}

/// Summary shown under a group header, e.g. "3 results (0.25 seconds)".
pub fn stats_line(group: &ResultGroup) -> String {
    let count = group.len();
    format!(
        "{} result{} ({:.2} seconds)",
        count,
        if count == 1 { "" } else { "s" },
        group.elapsed_ms as f64 / 1000.0
    )
}

/// Formats a modification timestamp: "Jul 2" within the year of `now`,
/// "Jul 2, 2019" otherwise.
pub fn format_modified(timestamp: i64, now: DateTime<Utc>) -> Option<String> {
    let date = DateTime::from_timestamp(timestamp, 0)?;
    let formatted = if date.year() == now.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    };
    Some(formatted)
}

/// Text content of an HTML fragment, for plain-text output.
pub fn plain_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}
