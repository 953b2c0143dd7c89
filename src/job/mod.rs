//! Job description and authorization predicates
//!
//! A `Job` is the immutable description of one update request: source,
//! allow/deny rules, advisories, ignore conditions, group configuration,
//! existing PR state and cooldown policy. It is read-only for the life
//! of a run and exposes the predicates every operation consults before
//! acting on a dependency.

mod cooldown;
mod definition;
mod flags;

pub use cooldown::Cooldown;
pub use definition::{
    AdvisoryConfig, AllowedUpdate, CooldownConfig, GroupConfig, GroupPullRequest, GroupRules,
    IgnoreCondition, JobConfig, JobDefinition, SourceConfig,
};
pub use flags::FeatureFlags;

use crate::domain::{
    Constraint, Dependency, PullRequestRef, SecurityAdvisory, UpdateType, Version, VersionRange,
};
use crate::wildcard;
use log::{info, warn};

/// Dependency-type rule values that only match manifest-declared
/// dependencies.
const TOP_LEVEL_DEPENDENCY_TYPES: &[&str] = &["direct", "production", "development"];

/// One configured update request.
#[derive(Debug, Clone)]
pub struct Job {
    config: JobConfig,
    flags: FeatureFlags,
    cooldown: Option<Cooldown>,
}

impl Job {
    /// Builds a job from a parsed definition.
    pub fn from_definition(definition: JobDefinition) -> Self {
        let mut config = definition.job;
        // A job without explicit allow rules covers direct
        // dependencies, all update types
        if config.allowed_updates.is_empty() {
            config.allowed_updates.push(AllowedUpdate {
                dependency_name: None,
                dependency_type: Some("direct".to_string()),
                update_type: None,
            });
        }
        let flags = FeatureFlags::from_experiments(&config.experiments);
        let cooldown = config.cooldown.as_ref().map(Cooldown::from_config);
        Self {
            config,
            flags,
            cooldown,
        }
    }

    pub fn package_manager(&self) -> &str {
        &self.config.package_manager
    }

    pub fn source(&self) -> &SourceConfig {
        &self.config.source
    }

    /// Every directory the job spans.
    pub fn directories(&self) -> Vec<String> {
        self.config.source.all_directories()
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn cooldown(&self) -> Option<&Cooldown> {
        self.cooldown.as_ref()
    }

    pub fn security_updates_only(&self) -> bool {
        self.config.security_updates_only
    }

    pub fn lockfile_only(&self) -> bool {
        self.config.lockfile_only
    }

    pub fn updating_a_pull_request(&self) -> bool {
        self.config.updating_a_pull_request
    }

    /// Dependency names the job targets (security updates, refreshes).
    pub fn target_dependencies(&self) -> &[String] {
        &self.config.dependencies
    }

    pub fn dependency_group_to_refresh(&self) -> Option<&str> {
        self.config.dependency_group_to_refresh.as_deref()
    }

    pub fn group_configs(&self) -> &[GroupConfig] {
        &self.config.dependency_groups
    }

    pub fn existing_pull_requests(&self) -> &[Vec<PullRequestRef>] {
        &self.config.existing_pull_requests
    }

    pub fn existing_group_pull_requests(&self) -> &[GroupPullRequest] {
        &self.config.existing_group_pull_requests
    }

    pub fn credentials(&self) -> &[serde_json::Value] {
        &self.config.credentials_metadata
    }

    pub fn experiments(&self) -> &std::collections::BTreeMap<String, serde_json::Value> {
        &self.config.experiments
    }

    /// True iff the dependency matches at least one allow rule and, in
    /// security mode, is actually vulnerable. `check_previous_version`
    /// selects which version the vulnerability check looks at.
    pub fn allowed_update(&self, dependency: &Dependency, check_previous_version: bool) -> bool {
        self.config.allowed_updates.iter().any(|rule| {
            let update_type = rule.update_type.as_deref().unwrap_or("all");
            let security_update = update_type == "security" || self.security_updates_only();
            if security_update && !self.vulnerable(dependency, check_previous_version) {
                return false;
            }

            if let Some(pattern) = &rule.dependency_name {
                if !wildcard::matches(pattern, &dependency.name) {
                    return false;
                }
            }

            let dep_type = rule.dependency_type.as_deref().unwrap_or("all");
            if dep_type == "indirect" && dependency.direct() {
                return false;
            }
            // Sub-dependencies only pass top-level rules in security
            // mode, where the advisory names them explicitly
            if !self.security_updates_only()
                && !dependency.direct()
                && TOP_LEVEL_DEPENDENCY_TYPES.contains(&dep_type)
            {
                return false;
            }
            if dependency.production() && dep_type == "development" {
                return false;
            }
            if !dependency.production() && dep_type == "production" {
                return false;
            }

            true
        })
    }

    /// True iff the selected version satisfies any advisory's affected
    /// ranges without being cleared by a patched/unaffected range. An
    /// empty advisory list means never vulnerable.
    pub fn vulnerable(&self, dependency: &Dependency, check_previous_version: bool) -> bool {
        let advisories = self.advisories_for(dependency);
        if advisories.is_empty() {
            return false;
        }

        let versions: Vec<Version> = if check_previous_version {
            dependency.parsed_previous_version().into_iter().collect()
        } else {
            dependency.all_versions()
        };
        // Versionless dependencies (no lockfile) cannot be matched
        // against advisory ranges
        if versions.is_empty() {
            return false;
        }

        advisories
            .iter()
            .any(|advisory| versions.iter().any(|v| advisory.vulnerable(v)))
    }

    /// True iff the update crossed from a vulnerable previous version
    /// to a non-vulnerable current one.
    pub fn security_fix(&self, dependency: &Dependency) -> bool {
        self.advisories_for(dependency)
            .iter()
            .any(|advisory| advisory.fixed_by(dependency))
    }

    /// Advisories naming this dependency (case-insensitive).
    pub fn advisories_for(&self, dependency: &Dependency) -> Vec<SecurityAdvisory> {
        self.config
            .security_advisories
            .iter()
            .filter(|adv| adv.dependency_name.eq_ignore_ascii_case(&dependency.name))
            .map(|adv| {
                SecurityAdvisory::new(
                    &adv.dependency_name,
                    &adv.affected_versions,
                    &adv.patched_versions,
                    &adv.unaffected_versions,
                )
            })
            .collect()
    }

    /// Translates the matching ignore conditions into ignored version
    /// ranges for the checker. Update-type conditions do not apply to
    /// security updates.
    pub fn ignored_ranges_for(&self, dependency: &Dependency) -> Vec<VersionRange> {
        let mut ranges = Vec::new();
        for condition in self.matching_ignore_conditions(dependency) {
            if let Some(requirement) = &condition.version_requirement {
                match VersionRange::parse(requirement) {
                    Some(range) => ranges.push(range),
                    None => warn!(
                        "Skipping unparsable ignore requirement '{}' for {}",
                        requirement, dependency.name
                    ),
                }
            }

            if self.security_updates_only() {
                continue;
            }
            let Some(current) = dependency.parsed_version() else {
                continue;
            };
            for update_type in &condition.update_types {
                if let Some(range) = ignored_range_for_update_type(update_type, &current) {
                    ranges.push(range);
                }
            }
        }
        ranges
    }

    /// Logs the ignore conditions that apply to a dependency, the way
    /// run transcripts expect them.
    pub fn log_ignore_conditions_for(&self, dependency: &Dependency) {
        let conditions: Vec<_> = self.matching_ignore_conditions(dependency).collect();
        if conditions.is_empty() {
            return;
        }

        info!("Ignored versions:");
        for condition in conditions {
            let source = condition.source.as_deref().unwrap_or("update config");
            if let Some(requirement) = &condition.version_requirement {
                info!("  {} - from {}", requirement, source);
            }
            for update_type in &condition.update_types {
                if self.security_updates_only() {
                    info!("  {} - from {} (doesn't apply to security update)", update_type, source);
                } else {
                    info!("  {} - from {}", update_type, source);
                }
            }
        }
    }

    fn matching_ignore_conditions<'a>(
        &'a self,
        dependency: &'a Dependency,
    ) -> impl Iterator<Item = &'a IgnoreCondition> {
        self.config
            .ignore_conditions
            .iter()
            .filter(|c| wildcard::matches(&c.dependency_name, &dependency.name))
    }
}

/// Builds the ignored range for one `update-types` entry relative to
/// the current version. Accepts both the `version-update:` prefixed
/// form and the bare form.
fn ignored_range_for_update_type(update_type: &str, current: &Version) -> Option<VersionRange> {
    let bare = update_type.strip_prefix("version-update:").unwrap_or(update_type);
    let parse = |s: String| Version::parse(&s).expect("bound is always numeric");

    let (kind, constraints) = match bare {
        "semver-major" | "major" => (
            UpdateType::SemverMajor,
            vec![Constraint::GreaterOrEqual(parse(format!(
                "{}.0.0",
                current.major() + 1
            )))],
        ),
        "semver-minor" | "minor" => (
            UpdateType::SemverMinor,
            vec![
                Constraint::GreaterOrEqual(parse(format!(
                    "{}.{}.0",
                    current.major(),
                    current.minor() + 1
                ))),
                Constraint::Less(parse(format!("{}.0.0", current.major() + 1))),
            ],
        ),
        "semver-patch" | "patch" => (
            UpdateType::SemverPatch,
            vec![
                Constraint::GreaterOrEqual(parse(format!(
                    "{}.{}.{}",
                    current.major(),
                    current.minor(),
                    current.patch() + 1
                ))),
                Constraint::Less(parse(format!(
                    "{}.{}.0",
                    current.major(),
                    current.minor() + 1
                ))),
            ],
        ),
        other => {
            warn!("Unknown ignore update-type '{}'", other);
            return None;
        }
    };

    Some(VersionRange::from_constraints(
        constraints,
        format!("{} of {}", kind.as_config_str(), current),
    ))
}
