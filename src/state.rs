//! Incremental per-search accumulation of result groups.

use serde::Serialize;
use tracing::{debug, warn};

use crate::ResultGroup;

/// Actions accepted by [`AggregationState::reduce`].
#[derive(Debug, Clone)]
pub enum Action {
    /// Drops every group and starts a new search generation.
    Reset,
    /// Appends a group produced for the given generation.
    Append {
        /// Generation the producing search belonged to.
        generation: u64,
        /// The completed group.
        group: ResultGroup,
    },
}

/// Result groups of the current search, in completion order.
///
/// Groups are never modified once appended. A group tagged with an older
/// generation than the current one is discarded, as is a second group for
/// an engine that already reported in this generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationState {
    generation: u64,
    groups: Vec<ResultGroup>,
}

impl AggregationState {
    /// Creates an empty state at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an action. Returns whether the state changed.
    pub fn reduce(&mut self, action: Action) -> bool {
        match action {
            Action::Reset => {
                self.generation += 1;
                self.groups.clear();
                true
            }
            Action::Append { generation, group } => {
                if generation != self.generation {
                    debug!(
                        "Discarding stale group from {} (generation {}, current {})",
                        group.engine_id, generation, self.generation
                    );
                    return false;
                }
                if self.group(&group.engine_id).is_some() {
                    warn!("Duplicate group from {} ignored", group.engine_id);
                    return false;
                }
                self.groups.push(group);
                true
            }
        }
    }

    /// Returns the current search generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the groups in completion order.
    pub fn groups(&self) -> &[ResultGroup] {
        &self.groups
    }

    /// Returns the group reported by an engine, if any.
    pub fn group(&self, engine_id: &str) -> Option<&ResultGroup> {
        self.groups.iter().find(|g| g.engine_id == engine_id)
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns whether no group has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
