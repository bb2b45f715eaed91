//! The enumerated set of supervisors a worker may report to.

use crate::config::RosterConfig;

/// Validated roster of supervisor identities.
///
/// Matching is case-insensitive; the canonical (lowercase) name is what
/// gets stored with every persisted event.
#[derive(Debug, Clone)]
pub struct SupervisorRoster {
    names: Vec<String>,
}

impl SupervisorRoster {
    pub fn new(config: &RosterConfig) -> Self {
        // RosterConfig already lowercases and rejects an empty list.
        Self {
            names: config.supervisors.clone(),
        }
    }

    /// Resolve input against the roster, returning the canonical name.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let normalized = input.trim().to_lowercase();
        self.names
            .iter()
            .find(|name| **name == normalized)
            .map(String::as_str)
    }

    /// Human-readable listing for reprompts ("tatiana or ivan").
    pub fn display_options(&self) -> String {
        self.names.join(" or ")
    }
}
