//! Feature flags for in-flight behavior changes
//!
//! The job's `experiments` map toggles behavior that is still being
//! rolled out. Flags are resolved once at job construction into this
//! immutable struct and threaded through constructors, so tests can
//! vary them per case without shared state.

use serde_json::Value;
use std::collections::BTreeMap;

/// Resolved experiment flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Restrict each dependency to its single most-specific matching
    /// group. Off means the legacy behavior: a dependency joins every
    /// matching group and may appear in several group PRs.
    pub group_specificity_enforcement: bool,
    /// Honor existing group PR entries from every directory when
    /// marking dependencies handled, not just the recording directory.
    pub cross_directory_existing_prs: bool,
    /// Forward unknown errors to the capture channel with class name,
    /// message and sanitized backtrace.
    pub record_unknown_errors: bool,
}

impl FeatureFlags {
    /// Reads flags from the job's experiments map. Keys are accepted in
    /// kebab-case or snake_case; truthiness follows JSON booleans, with
    /// the string "true" also accepted.
    pub fn from_experiments(experiments: &BTreeMap<String, Value>) -> Self {
        let enabled = |name: &str| -> bool {
            experiments
                .iter()
                .find(|(key, _)| key.replace('_', "-") == name)
                .map(|(_, value)| match value {
                    Value::Bool(b) => *b,
                    Value::String(s) => s == "true",
                    _ => false,
                })
                .unwrap_or(false)
        };

        Self {
            group_specificity_enforcement: enabled("group-specificity-enforcement"),
            cross_directory_existing_prs: enabled("cross-directory-existing-prs"),
            record_unknown_errors: enabled("record-unknown-errors"),
        }
    }
}
