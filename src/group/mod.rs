//! Dependency grouping
//!
//! Groups collect dependencies that should be updated together in one
//! pull request, selected by name globs and update-type rules from the
//! job configuration.

mod engine;
mod specificity;

pub use engine::DependencyGroupEngine;
pub use specificity::PatternSpecificityCalculator;

use crate::domain::Dependency;
use crate::job::GroupRules;
use crate::wildcard;

/// A named bucket of dependencies updated together in one PR.
///
/// The assigned dependency list is cleared and rebuilt on every
/// assignment pass.
#[derive(Debug, Clone)]
pub struct DependencyGroup {
    /// Unique name within a job
    pub name: String,
    /// Matching rules from the job configuration
    pub rules: GroupRules,
    /// `version-updates` or `security-updates`, when configured
    pub applies_to: Option<String>,
    dependencies: Vec<Dependency>,
}

impl DependencyGroup {
    pub fn new(name: impl Into<String>, rules: GroupRules, applies_to: Option<String>) -> Self {
        Self {
            name: name.into(),
            rules,
            applies_to,
            dependencies: Vec::new(),
        }
    }

    /// True when the rules match a dependency name: any pattern matches
    /// and no exclude pattern does. A group without patterns matches
    /// every name.
    pub fn matches(&self, name: &str) -> bool {
        if self
            .rules
            .exclude_patterns
            .iter()
            .any(|p| wildcard::matches(p, name))
        {
            return false;
        }
        if self.rules.patterns.is_empty() {
            return true;
        }
        self.rules.patterns.iter().any(|p| wildcard::matches(p, name))
    }

    /// Dependencies assigned in the last assignment pass.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// True when the group holds this dependency name.
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d.name == name)
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies.push(dependency);
    }

    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Whether `group-by: "dependency-name"` subgrouping is requested.
    pub fn groups_by_dependency_name(&self) -> bool {
        self.rules.group_by.as_deref() == Some("dependency-name")
    }

    /// The composite name a dynamic subgroup gets.
    pub fn subgroup_name(&self, dependency_name: &str) -> String {
        format!("{}/{}", self.name, dependency_name)
    }
}
