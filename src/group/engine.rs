//! Group construction and dependency assignment

use super::{DependencyGroup, PatternSpecificityCalculator};
use crate::domain::Dependency;
use crate::job::{FeatureFlags, GroupConfig};
use log::warn;

/// Package-manager names a group name can collide with; the collision
/// is legal but usually a configuration mistake worth flagging.
const KNOWN_PACKAGE_MANAGERS: &[&str] = &[
    "bundler", "cargo", "composer", "docker", "github-actions", "go-modules", "gradle", "maven",
    "npm", "nuget", "pip", "pub", "terraform", "yarn",
];

/// Builds `DependencyGroup`s from job configuration and assigns a flat
/// dependency list into them.
#[derive(Debug)]
pub struct DependencyGroupEngine {
    groups: Vec<DependencyGroup>,
    ungrouped: Vec<Dependency>,
    flags: FeatureFlags,
    calculator: PatternSpecificityCalculator,
}

impl DependencyGroupEngine {
    /// Builds the engine from group configuration. Construction
    /// validates but never rejects: suspicious configuration produces
    /// warnings, not errors.
    pub fn from_job_config(configs: &[GroupConfig], flags: FeatureFlags) -> Self {
        let mut groups = Vec::new();
        for config in configs {
            if KNOWN_PACKAGE_MANAGERS.contains(&config.name.as_str()) {
                warn!(
                    "Group name '{}' collides with a package-manager name",
                    config.name
                );
            }
            if config.rules.patterns.is_empty()
                && config.rules.exclude_patterns.is_empty()
                && config.rules.update_types.is_empty()
            {
                warn!(
                    "Group '{}' has only cosmetic rules and will match every dependency",
                    config.name
                );
            }
            groups.push(DependencyGroup::new(
                &config.name,
                config.rules.clone(),
                config.applies_to.clone(),
            ));
        }

        Self {
            groups,
            ungrouped: Vec::new(),
            flags,
            calculator: PatternSpecificityCalculator::new(),
        }
    }

    /// Assigns dependencies to groups, clearing any previous pass.
    ///
    /// With specificity enforcement on, each dependency lands only in
    /// its single most-specific matching group (declaration order
    /// breaks ties). With it off, the dependency joins every matching
    /// group and may appear in several group PRs. Dependencies matching
    /// no group become ungrouped. Groups with `group-by:
    /// "dependency-name"` are then replaced by one subgroup per matched
    /// name.
    pub fn assign_to_groups(&mut self, dependencies: &[Dependency]) {
        for group in &mut self.groups {
            group.clear_dependencies();
        }
        self.ungrouped.clear();

        for dependency in dependencies {
            let matching: Vec<usize> = self
                .groups
                .iter()
                .enumerate()
                .filter(|(_, group)| group.matches(&dependency.name))
                .map(|(idx, _)| idx)
                .collect();

            if matching.is_empty() {
                self.ungrouped.push(dependency.clone());
                continue;
            }

            if self.flags.group_specificity_enforcement {
                // Strictly-greater comparison keeps the earliest
                // declared group on ties
                let mut best = matching[0];
                let mut best_score = self
                    .calculator
                    .group_specificity(&self.groups[best], dependency);
                for &idx in &matching[1..] {
                    let score = self
                        .calculator
                        .group_specificity(&self.groups[idx], dependency);
                    if score > best_score {
                        best = idx;
                        best_score = score;
                    }
                }
                self.groups[best].add_dependency(dependency.clone());
            } else {
                for idx in matching {
                    self.groups[idx].add_dependency(dependency.clone());
                }
            }
        }

        self.materialize_subgroups();
        self.warn_about_empty_groups();
    }

    /// True iff some other group matching the dependency is strictly
    /// more specific. Always false when enforcement is off.
    pub fn should_skip_due_to_specificity(
        &self,
        group: &DependencyGroup,
        dependency: &Dependency,
    ) -> bool {
        if !self.flags.group_specificity_enforcement {
            return false;
        }
        self.calculator
            .should_skip_due_to_specificity(group, dependency, &self.groups)
    }

    /// Finds a group by name, including dynamic `parent/dep` subgroup
    /// names, so refresh operations can address them.
    pub fn find_group(&self, name: &str) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    /// Dependencies matching no group in the last assignment pass.
    pub fn ungrouped_dependencies(&self) -> &[Dependency] {
        &self.ungrouped
    }

    /// Replaces each `group-by: "dependency-name"` group with one
    /// subgroup per matched dependency; the parent group is dropped
    /// and never used for PR creation.
    fn materialize_subgroups(&mut self) {
        let mut rebuilt = Vec::with_capacity(self.groups.len());
        for group in self.groups.drain(..) {
            if !group.groups_by_dependency_name() {
                rebuilt.push(group);
                continue;
            }
            for dependency in group.dependencies() {
                let mut subgroup = DependencyGroup::new(
                    group.subgroup_name(&dependency.name),
                    group.rules.clone(),
                    group.applies_to.clone(),
                );
                subgroup.add_dependency(dependency.clone());
                rebuilt.push(subgroup);
            }
        }
        self.groups = rebuilt;
    }

    fn warn_about_empty_groups(&self) {
        let empty: Vec<&str> = self
            .groups
            .iter()
            .filter(|g| g.is_empty())
            .map(|g| g.name.as_str())
            .collect();
        if !empty.is_empty() {
            warn!(
                "Dependency groups matched no dependencies: {}",
                empty.join(", ")
            );
        }
    }
}
