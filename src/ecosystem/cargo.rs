//! Cargo ecosystem
//!
//! Reference implementation over Cargo.toml manifests:
//! - dependencies, dev-dependencies and build-dependencies tables,
//!   in both string and inline-table form
//! - requirement rewriting that preserves the original formatting
//!
//! Resolution fidelity (lockfiles, features, workspaces) stays with the
//! real tooling; this implementation covers what the decision engine
//! needs.

use super::checker::RegistryUpdateChecker;
use super::{CheckerConfig, Ecosystem, FileParser, FileUpdater, UpdateChecker};
use crate::domain::{Dependency, DependencyFile, Requirement, Version};
use crate::error::UpdaterError;
use crate::registry::VersionSource;
use regex::Regex;
use semver::VersionReq;
use std::sync::Arc;
use toml::Value;

const MANIFEST: &str = "Cargo.toml";

/// Cargo capability set backed by a registry version source.
pub struct CargoEcosystem {
    source: Arc<dyn VersionSource>,
}

impl CargoEcosystem {
    pub fn new(source: Arc<dyn VersionSource>) -> Self {
        Self { source }
    }
}

impl Ecosystem for CargoEcosystem {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn manifest_names(&self) -> &'static [&'static str] {
        &[MANIFEST]
    }

    fn file_parser(&self) -> Box<dyn FileParser> {
        Box::new(CargoFileParser)
    }

    fn update_checker(
        &self,
        dependency: Dependency,
        _files: Vec<DependencyFile>,
        config: CheckerConfig,
    ) -> Box<dyn UpdateChecker> {
        Box::new(RegistryUpdateChecker::new(
            dependency,
            config,
            Arc::clone(&self.source),
        ))
    }

    fn file_updater(&self) -> Box<dyn FileUpdater> {
        Box::new(CargoFileUpdater)
    }
}

/// True when a cargo requirement string admits the given version; used
/// to sanity-check rewrites in tests and by callers deciding whether a
/// requirement actually needs to move.
pub fn requirement_satisfied(requirement: &str, version: &Version) -> bool {
    let Ok(req) = VersionReq::parse(requirement) else {
        return false;
    };
    let Ok(parsed) = semver::Version::parse(version.as_str()) else {
        return false;
    };
    req.matches(&parsed)
}

struct CargoFileParser;

impl FileParser for CargoFileParser {
    fn parse(&self, files: &[DependencyFile]) -> Result<Vec<Dependency>, UpdaterError> {
        let mut dependencies = Vec::new();
        for file in files.iter().filter(|f| f.name == MANIFEST) {
            let manifest: Value = file.content.parse().map_err(|e: toml::de::Error| {
                UpdaterError::not_evaluatable(format!("{}: {e}", file.name))
            })?;

            for (table, group) in [
                ("dependencies", "dependencies"),
                ("dev-dependencies", "dev-dependencies"),
                ("build-dependencies", "build-dependencies"),
            ] {
                let Some(entries) = manifest.get(table).and_then(|t| t.as_table()) else {
                    continue;
                };
                for (name, value) in entries {
                    let requirement = match value {
                        Value::String(s) => Some(s.clone()),
                        Value::Table(t) => {
                            t.get("version").and_then(|v| v.as_str()).map(String::from)
                        }
                        _ => None,
                    };
                    // Path and git dependencies without a version are
                    // not updatable through a registry
                    let Some(requirement) = requirement else {
                        continue;
                    };

                    let dep = Dependency::new(
                        name.clone(),
                        pinned_version(&requirement),
                        vec![Requirement::new(MANIFEST, Some(requirement.clone()))
                            .with_groups(vec![group.to_string()])],
                        "cargo",
                    )
                    .in_directory(file.directory.clone());
                    dependencies.push(dep);
                }
            }
        }
        Ok(dependencies)
    }
}

/// Without a lockfile the best version estimate is the requirement's
/// base version.
fn pinned_version(requirement: &str) -> Option<String> {
    let trimmed = requirement.trim().trim_start_matches(['^', '~', '=', '>', '<', ' ']);
    Version::parse(trimmed).map(|v| v.as_str().to_string())
}

struct CargoFileUpdater;

impl FileUpdater for CargoFileUpdater {
    fn updated_files(
        &self,
        files: &[DependencyFile],
        dependencies: &[Dependency],
    ) -> Result<Vec<DependencyFile>, UpdaterError> {
        let mut updated_files = Vec::new();
        for file in files.iter().filter(|f| f.name == MANIFEST && !f.support_file) {
            let mut content = file.content.clone();
            let mut changed = false;
            for dependency in dependencies.iter().filter(|d| d.directory == file.directory) {
                for requirement in &dependency.requirements {
                    if requirement.file != file.name {
                        continue;
                    }
                    let Some(range) = &requirement.requirement else {
                        continue;
                    };
                    if rewrite_manifest(&mut content, &dependency.name, range) {
                        changed = true;
                    }
                }
            }
            if changed {
                let mut updated = file.clone();
                updated.content = content;
                updated_files.push(updated);
            }
        }
        Ok(updated_files)
    }
}

/// Rewrites a dependency's requirement in manifest text, handling the
/// simple-string and inline-table forms while preserving everything
/// else on the line.
fn rewrite_manifest(content: &mut String, package: &str, new_requirement: &str) -> bool {
    let escaped = regex::escape(package);

    let simple = format!(r#"(?m)^(\s*{escaped}\s*=\s*)"[^"]+""#);
    if let Ok(re) = Regex::new(&simple) {
        if re.is_match(content) {
            let replacement = format!(r#"${{1}}"{new_requirement}""#);
            *content = re.replace(content, replacement.as_str()).to_string();
            return true;
        }
    }

    let table = format!(r#"(?m)({escaped}\s*=\s*\{{[^}}]*version\s*=\s*)"[^"]+""#);
    if let Ok(re) = Regex::new(&table) {
        if re.is_match(content) {
            let replacement = format!(r#"${{1}}"{new_requirement}""#);
            *content = re.replace(content, replacement.as_str()).to_string();
            return true;
        }
    }

    false
}
