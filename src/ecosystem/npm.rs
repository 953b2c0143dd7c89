//! npm ecosystem
//!
//! Reference implementation over package.json manifests:
//! - dependencies, devDependencies, peerDependencies and
//!   optionalDependencies
//! - regex-based requirement rewriting that preserves formatting and
//!   key order

use super::checker::RegistryUpdateChecker;
use super::{CheckerConfig, Ecosystem, FileParser, FileUpdater, UpdateChecker};
use crate::domain::{Dependency, DependencyFile, Requirement, Version};
use crate::error::UpdaterError;
use crate::registry::VersionSource;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

const MANIFEST: &str = "package.json";

/// Dependency sections of a package.json, with their group labels.
const SECTIONS: &[(&str, &str)] = &[
    ("dependencies", "dependencies"),
    ("devDependencies", "devDependencies"),
    ("peerDependencies", "peerDependencies"),
    ("optionalDependencies", "optionalDependencies"),
];

/// npm capability set backed by a registry version source.
pub struct NpmEcosystem {
    source: Arc<dyn VersionSource>,
}

impl NpmEcosystem {
    pub fn new(source: Arc<dyn VersionSource>) -> Self {
        Self { source }
    }
}

impl Ecosystem for NpmEcosystem {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn manifest_names(&self) -> &'static [&'static str] {
        &[MANIFEST]
    }

    fn file_parser(&self) -> Box<dyn FileParser> {
        Box::new(NpmFileParser)
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
        Box::new(NpmFileUpdater)
    }
}

struct NpmFileParser;

impl FileParser for NpmFileParser {
    fn parse(&self, files: &[DependencyFile]) -> Result<Vec<Dependency>, UpdaterError> {
        let mut dependencies = Vec::new();
        for file in files.iter().filter(|f| f.name == MANIFEST) {
            let json: Value = serde_json::from_str(&file.content)
                .map_err(|e| UpdaterError::not_evaluatable(format!("{}: {e}", file.name)))?;

            for (section, group) in SECTIONS {
                let Some(entries) = json.get(*section).and_then(|v| v.as_object()) else {
                    continue;
                };
                for (name, value) in entries {
                    let Some(requirement) = value.as_str() else {
                        continue;
                    };
                    // Workspace and file references are not registry
                    // packages
                    if requirement.starts_with("file:") || requirement.starts_with("workspace:") {
                        continue;
                    }
                    let dep = Dependency::new(
                        name.clone(),
                        base_version(requirement),
                        vec![Requirement::new(MANIFEST, Some(requirement.to_string()))
                            .with_groups(vec![group.to_string()])],
                        "npm",
                    )
                    .in_directory(file.directory.clone());
                    dependencies.push(dep);
                }
            }
        }
        Ok(dependencies)
    }
}

/// Best version estimate without a lockfile: the requirement's base
/// version.
fn base_version(requirement: &str) -> Option<String> {
    let trimmed = requirement.trim().trim_start_matches(['^', '~', '=', '>', '<', ' ', 'v']);
    Version::parse(trimmed).map(|v| v.as_str().to_string())
}

struct NpmFileUpdater;

impl FileUpdater for NpmFileUpdater {
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

/// Rewrites `"package": "<requirement>"` in place, preserving original
/// formatting and key order.
fn rewrite_manifest(content: &mut String, package: &str, new_requirement: &str) -> bool {
    let pattern = format!(r#"("{}"\s*:\s*)"[^"]+""#, regex::escape(package));
    let Ok(re) = Regex::new(&pattern) else {
        return false;
    };
    if !re.is_match(content) {
        return false;
    }
    let replacement = format!(r#"${{1}}"{new_requirement}""#);
    *content = re.replace(content, replacement.as_str()).to_string();
    true
}
