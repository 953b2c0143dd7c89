//! Dependency and requirement structures

use super::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared groups that mark a requirement as production code.
const PRODUCTION_GROUPS: &[&str] = &["default", "dependencies", "runtime", "production"];

/// Where a requirement's package is sourced from, when not the default
/// registry (git dependencies, alternate registries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSource {
    /// Source type, e.g. "git" or "registry"
    #[serde(rename = "type")]
    pub kind: String,
    /// Source URL, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One requirement on a dependency, tied to the file that declares it.
///
/// Requirements are kept in file-discovery order and are only ever
/// appended to for a given file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// The file declaring this requirement
    pub file: String,
    /// The requirement range string, None for lockfile-only entries
    pub requirement: Option<String>,
    /// Ecosystem-declared groups (e.g. "dependencies", "devDependencies")
    #[serde(default)]
    pub groups: Vec<String>,
    /// Source override, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RequirementSource>,
}

impl Requirement {
    /// Creates a requirement with no groups or source.
    pub fn new(file: impl Into<String>, requirement: Option<String>) -> Self {
        Self {
            file: file.into(),
            requirement,
            groups: Vec::new(),
            source: None,
        }
    }

    /// Sets the declared groups (builder pattern).
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }
}

/// A dependency parsed out of one directory's dependency files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Ecosystem-namespaced package name
    pub name: String,
    /// Resolved version, None when no lockfile pins one
    pub version: Option<String>,
    /// Version before the update, set on updated dependencies
    #[serde(default)]
    pub previous_version: Option<String>,
    /// Requirements in file-discovery order
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Requirements before the update
    #[serde(default)]
    pub previous_requirements: Vec<Requirement>,
    /// Owning package manager name, e.g. "cargo"
    pub package_manager: String,
    /// True when the update removes this dependency
    #[serde(default)]
    pub removed: bool,
    /// Directory this dependency was parsed from
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Versions linked to this one through a shared version property
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_versions: Vec<Version>,
}

fn default_directory() -> String {
    "/".to_string()
}

impl Dependency {
    /// Creates a dependency with the minimum fields.
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        requirements: Vec<Requirement>,
        package_manager: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            previous_version: None,
            requirements,
            previous_requirements: Vec::new(),
            package_manager: package_manager.into(),
            removed: false,
            directory: default_directory(),
            related_versions: Vec::new(),
        }
    }

    /// Sets the directory (builder pattern).
    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Sets previous version and requirements (builder pattern).
    pub fn with_previous(
        mut self,
        version: Option<String>,
        requirements: Vec<Requirement>,
    ) -> Self {
        self.previous_version = version;
        self.previous_requirements = requirements;
        self
    }

    /// True when the dependency is declared in a manifest rather than
    /// only appearing in a lockfile.
    pub fn direct(&self) -> bool {
        !self.requirements.is_empty()
    }

    /// True when any requirement belongs to a production group. A
    /// requirement with no declared groups counts as production.
    pub fn production(&self) -> bool {
        if self.requirements.is_empty() {
            // Sub-dependencies are reachable from production code
            return true;
        }
        self.requirements.iter().any(|req| {
            req.groups.is_empty()
                || req
                    .groups
                    .iter()
                    .any(|g| PRODUCTION_GROUPS.contains(&g.as_str()))
        })
    }

    /// The resolved version, parsed. None when absent or unparsable.
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(Version::parse)
    }

    /// The previous version, parsed.
    pub fn parsed_previous_version(&self) -> Option<Version> {
        self.previous_version.as_deref().and_then(Version::parse)
    }

    /// All versions this dependency is known at, current first. Linked
    /// versions come from shared version properties.
    pub fn all_versions(&self) -> Vec<Version> {
        let mut versions = Vec::new();
        if let Some(v) = self.parsed_version() {
            versions.push(v);
        }
        versions.extend(self.related_versions.iter().cloned());
        versions
    }

    /// `name@version` form used in logs and PR de-duplication, with
    /// `@removed` for removed dependencies.
    pub fn humanized(&self) -> String {
        if self.removed {
            format!("{}@removed", self.name)
        } else {
            format!("{}@{}", self.name, self.version.as_deref().unwrap_or("?"))
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.humanized())
    }
}
