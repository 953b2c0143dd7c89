//! Job definition wire format
//!
//! The backend hands the updater one JSON document describing the whole
//! job. All keys are kebab-case on the wire regardless of internal
//! naming; this module is the only place that shape is spelled out.

use crate::domain::PullRequestRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level document: `{ "job": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub job: JobConfig,
}

impl JobDefinition {
    /// Parses a job definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The job body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    pub package_manager: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub allowed_updates: Vec<AllowedUpdate>,
    #[serde(default)]
    pub security_advisories: Vec<AdvisoryConfig>,
    #[serde(default)]
    pub ignore_conditions: Vec<IgnoreCondition>,
    #[serde(default)]
    pub dependency_groups: Vec<GroupConfig>,
    #[serde(default)]
    pub existing_pull_requests: Vec<Vec<PullRequestRef>>,
    #[serde(default)]
    pub existing_group_pull_requests: Vec<GroupPullRequest>,
    #[serde(default)]
    pub security_updates_only: bool,
    #[serde(default)]
    pub lockfile_only: bool,
    #[serde(default)]
    pub updating_a_pull_request: bool,
    /// Dependency names this job targets (security updates, refreshes)
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub dependency_group_to_refresh: Option<String>,
    #[serde(default)]
    pub experiments: BTreeMap<String, Value>,
    #[serde(default)]
    pub cooldown: Option<CooldownConfig>,
    #[serde(default)]
    pub credentials_metadata: Vec<Value>,
}

/// Where the dependency files come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    pub provider: String,
    pub repo: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub directories: Option<Vec<String>>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

impl SourceConfig {
    /// The directories the job spans; `directory` and `directories`
    /// are alternatives on the wire, defaulting to the repo root.
    pub fn all_directories(&self) -> Vec<String> {
        if let Some(dirs) = &self.directories {
            if !dirs.is_empty() {
                return dirs.clone();
            }
        }
        vec![self.directory.clone().unwrap_or_else(|| "/".to_string())]
    }
}

/// One allow rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AllowedUpdate {
    /// Name glob, absent means match any name
    #[serde(default)]
    pub dependency_name: Option<String>,
    /// direct | indirect | production | development | all
    #[serde(default)]
    pub dependency_type: Option<String>,
    /// all | security
    #[serde(default)]
    pub update_type: Option<String>,
}

/// One security advisory, as raw range strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdvisoryConfig {
    pub dependency_name: String,
    #[serde(default)]
    pub affected_versions: Vec<String>,
    #[serde(default)]
    pub patched_versions: Vec<String>,
    #[serde(default)]
    pub unaffected_versions: Vec<String>,
}

/// One ignore condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IgnoreCondition {
    pub dependency_name: String,
    #[serde(default)]
    pub version_requirement: Option<String>,
    /// `version-update:semver-major` etc., bare forms also accepted
    #[serde(default)]
    pub update_types: Vec<String>,
    /// Where the rule came from, only used in log lines
    #[serde(default)]
    pub source: Option<String>,
}

/// One dependency group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub applies_to: Option<String>,
    #[serde(default)]
    pub rules: GroupRules,
}

/// Group matching rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupRules {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub update_types: Vec<String>,
    /// `"dependency-name"` materializes one subgroup per matched name
    #[serde(default)]
    pub group_by: Option<String>,
}

/// An existing pull request created for a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupPullRequest {
    pub dependency_group_name: String,
    #[serde(default)]
    pub dependencies: Vec<PullRequestRef>,
}

/// Cooldown windows, in days.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CooldownConfig {
    #[serde(default)]
    pub default_days: u32,
    #[serde(default)]
    pub semver_major_days: Option<u32>,
    #[serde(default)]
    pub semver_minor_days: Option<u32>,
    #[serde(default)]
    pub semver_patch_days: Option<u32>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "job": {
            "package-manager": "cargo",
            "source": {"provider": "github", "repo": "org/repo", "directory": "/"}
        }
    }"#;

    #[test]
    fn test_minimal_definition() {
        let def = JobDefinition::from_json(MINIMAL).unwrap();
        assert_eq!(def.job.package_manager, "cargo");
        assert_eq!(def.job.source.all_directories(), vec!["/"]);
        assert!(!def.job.security_updates_only);
        assert!(def.job.allowed_updates.is_empty());
    }

    #[test]
    fn test_directories_override_directory() {
        let def = JobDefinition::from_json(
            r#"{"job": {"package-manager": "npm", "source": {
                "provider": "github", "repo": "org/repo",
                "directory": "/", "directories": ["/a", "/b"]
            }}}"#,
        )
        .unwrap();
        assert_eq!(def.job.source.all_directories(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_full_definition() {
        let def = JobDefinition::from_json(
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"},
                "allowed-updates": [
                    {"dependency-name": "lodash*", "dependency-type": "direct", "update-type": "all"}
                ],
                "security-advisories": [
                    {"dependency-name": "lodash",
                     "affected-versions": ["< 4.17.12"],
                     "patched-versions": [">= 4.17.12"]}
                ],
                "ignore-conditions": [
                    {"dependency-name": "react", "update-types": ["version-update:semver-major"]}
                ],
                "dependency-groups": [
                    {"name": "dev", "rules": {"patterns": ["eslint*"], "exclude-patterns": ["eslint-config-a"]}}
                ],
                "existing-pull-requests": [
                    [{"dependency-name": "lodash", "dependency-version": "4.17.21"}]
                ],
                "existing-group-pull-requests": [
                    {"dependency-group-name": "dev",
                     "dependencies": [{"dependency-name": "eslint", "dependency-version": "9.0.0", "directory": "/"}]}
                ],
                "security-updates-only": true,
                "dependencies": ["lodash"],
                "experiments": {"group-specificity-enforcement": true},
                "cooldown": {"default-days": 3, "semver-major-days": 7, "exclude": ["react*"]}
            }}"#,
        )
        .unwrap();

        let job = def.job;
        assert_eq!(job.allowed_updates.len(), 1);
        assert_eq!(
            job.allowed_updates[0].dependency_name.as_deref(),
            Some("lodash*")
        );
        assert_eq!(job.security_advisories[0].affected_versions, vec!["< 4.17.12"]);
        assert_eq!(
            job.ignore_conditions[0].update_types,
            vec!["version-update:semver-major"]
        );
        assert_eq!(job.dependency_groups[0].rules.patterns, vec!["eslint*"]);
        assert_eq!(job.existing_pull_requests[0][0].dependency_name, "lodash");
        assert_eq!(
            job.existing_group_pull_requests[0].dependency_group_name,
            "dev"
        );
        assert!(job.security_updates_only);
        assert_eq!(job.cooldown.as_ref().unwrap().default_days, 3);
        assert_eq!(job.cooldown.as_ref().unwrap().semver_major_days, Some(7));
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let def = JobDefinition::from_json(
            r#"{"job": {
                "package-manager": "cargo",
                "source": {"provider": "github", "repo": "org/repo"},
                "commit-message-options": {"prefix": "chore"}
            }}"#,
        );
        assert!(def.is_ok());
    }
}
