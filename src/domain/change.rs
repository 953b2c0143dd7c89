//! Units of work flowing to the service boundary
//!
//! A `DependencyChange` is computed once per decision and handed
//! straight to the service for PR creation or update; it is never
//! persisted. `PullRequestRef` is the serialized shape existing pull
//! requests arrive in, used for de-duplication.

use super::dependency::Dependency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What happened to a dependency file in a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    #[default]
    Update,
    Create,
    Delete,
}

/// One dependency file, as fetched or as updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFile {
    /// File name relative to the directory
    pub name: String,
    /// Directory the file lives in, "/" for the repository root
    pub directory: String,
    /// Full file content
    pub content: String,
    /// Support files inform parsing but are excluded from change sets
    #[serde(default)]
    pub support_file: bool,
    /// Operation performed on this file
    #[serde(default)]
    pub operation: FileOperation,
}

impl DependencyFile {
    /// Creates a file at the repository root.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: "/".to_string(),
            content: content.into(),
            support_file: false,
            operation: FileOperation::Update,
        }
    }

    /// Sets the directory (builder pattern).
    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// A computed unit of work: the dependencies that change and the file
/// edits that realize the change, optionally on behalf of a group.
#[derive(Debug, Clone)]
pub struct DependencyChange {
    /// Dependencies being updated, lead dependency first
    pub updated_dependencies: Vec<Dependency>,
    /// Files after the update, support files excluded
    pub updated_files: Vec<DependencyFile>,
    /// Group this change was compiled for, if any
    pub group_name: Option<String>,
}

impl DependencyChange {
    /// A change for a single ungrouped decision.
    pub fn new(updated_dependencies: Vec<Dependency>, updated_files: Vec<DependencyFile>) -> Self {
        Self {
            updated_dependencies,
            updated_files,
            group_name: None,
        }
    }

    /// A change compiled on behalf of a group.
    pub fn for_group(
        group_name: impl Into<String>,
        updated_dependencies: Vec<Dependency>,
        updated_files: Vec<DependencyFile>,
    ) -> Self {
        Self {
            updated_dependencies,
            updated_files,
            group_name: Some(group_name.into()),
        }
    }

    /// Names of the updated dependencies, in order.
    pub fn dependency_names(&self) -> Vec<String> {
        self.updated_dependencies.iter().map(|d| d.name.clone()).collect()
    }

    /// The de-duplication refs for this change.
    pub fn pull_request_refs(&self) -> Vec<PullRequestRef> {
        self.updated_dependencies.iter().map(PullRequestRef::from_dependency).collect()
    }
}

/// One dependency entry of an existing (or just created) pull request,
/// in the serialized wire shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Dependency name
    #[serde(rename = "dependency-name")]
    pub dependency_name: String,
    /// Updated-to version; absent for removed dependencies
    #[serde(rename = "dependency-version", skip_serializing_if = "Option::is_none")]
    pub dependency_version: Option<String>,
    /// True when the PR removes the dependency
    #[serde(rename = "dependency-removed", default, skip_serializing_if = "std::ops::Not::not")]
    pub dependency_removed: bool,
    /// Directory the PR entry was recorded against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl PullRequestRef {
    /// Builds the ref for an updated dependency.
    pub fn from_dependency(dependency: &Dependency) -> Self {
        Self {
            dependency_name: dependency.name.clone(),
            dependency_version: if dependency.removed {
                None
            } else {
                dependency.version.clone()
            },
            dependency_removed: dependency.removed,
            directory: Some(dependency.directory.clone()),
        }
    }

    /// `name@version` / `name@removed` form for log lines.
    pub fn humanized(&self) -> String {
        if self.dependency_removed {
            format!("{}@removed", self.dependency_name)
        } else {
            format!(
                "{}@{}",
                self.dependency_name,
                self.dependency_version.as_deref().unwrap_or("?")
            )
        }
    }

    fn comparison_key(&self) -> (String, Option<String>, bool) {
        (
            self.dependency_name.clone(),
            self.dependency_version.clone(),
            self.dependency_removed,
        )
    }
}

/// True when two PR dependency sets describe the same logical change.
/// Order does not matter; directories are ignored since existing PR
/// entries predate multi-directory jobs.
pub fn same_pull_request(a: &[PullRequestRef], b: &[PullRequestRef]) -> bool {
    let set_a: BTreeSet<_> = a.iter().map(PullRequestRef::comparison_key).collect();
    let set_b: BTreeSet<_> = b.iter().map(PullRequestRef::comparison_key).collect();
    set_a == set_b
}

/// Directory-scoped variant used for PRs created within the same run,
/// where the same dependency may legitimately ship one PR per
/// directory. Missing directories count as the repository root.
pub fn same_pull_request_in_directory(a: &[PullRequestRef], b: &[PullRequestRef]) -> bool {
    let scoped_key = |pr: &PullRequestRef| {
        (
            pr.comparison_key(),
            pr.directory.clone().unwrap_or_else(|| "/".to_string()),
        )
    };
    let set_a: BTreeSet<_> = a.iter().map(scoped_key).collect();
    let set_b: BTreeSet<_> = b.iter().map(scoped_key).collect();
    set_a == set_b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr_ref(name: &str, version: &str) -> PullRequestRef {
        PullRequestRef {
            dependency_name: name.to_string(),
            dependency_version: Some(version.to_string()),
            dependency_removed: false,
            directory: None,
        }
    }

    #[test]
    fn test_same_pull_request_ignores_order() {
        let a = vec![pr_ref("a", "1.0.0"), pr_ref("b", "2.0.0")];
        let b = vec![pr_ref("b", "2.0.0"), pr_ref("a", "1.0.0")];
        assert!(same_pull_request(&a, &b));
    }

    #[test]
    fn test_same_pull_request_differs_on_version() {
        let a = vec![pr_ref("a", "1.0.0")];
        let b = vec![pr_ref("a", "1.0.1")];
        assert!(!same_pull_request(&a, &b));
    }

    #[test]
    fn test_same_pull_request_differs_on_removed() {
        let a = vec![pr_ref("a", "1.0.0")];
        let mut removed = pr_ref("a", "1.0.0");
        removed.dependency_version = None;
        removed.dependency_removed = true;
        assert!(!same_pull_request(&a, &[removed]));
    }

    #[test]
    fn test_directory_scoped_comparison() {
        let mut in_a = pr_ref("a", "1.0.0");
        in_a.directory = Some("/a".to_string());
        let mut in_b = pr_ref("a", "1.0.0");
        in_b.directory = Some("/b".to_string());

        // Directory-agnostic: the same logical change
        assert!(same_pull_request(
            std::slice::from_ref(&in_a),
            std::slice::from_ref(&in_b)
        ));
        // Directory-scoped: distinct per-directory changes
        assert!(!same_pull_request_in_directory(
            std::slice::from_ref(&in_a),
            std::slice::from_ref(&in_b)
        ));
        assert!(same_pull_request_in_directory(
            std::slice::from_ref(&in_a),
            &[in_a.clone()]
        ));
    }

    #[test]
    fn test_ref_from_removed_dependency_has_no_version() {
        let mut dep = Dependency::new("left-pad", Some("1.0.0".into()), vec![], "npm");
        dep.removed = true;
        let pr = PullRequestRef::from_dependency(&dep);
        assert!(pr.dependency_version.is_none());
        assert!(pr.dependency_removed);
        assert_eq!(pr.humanized(), "left-pad@removed");
    }

    #[test]
    fn test_wire_format_uses_kebab_case() {
        let json = serde_json::to_string(&pr_ref("serde", "1.0.0")).unwrap();
        assert!(json.contains("\"dependency-name\""));
        assert!(json.contains("\"dependency-version\""));
    }

    #[test]
    fn test_change_for_group() {
        let dep = Dependency::new("serde", Some("1.0.0".into()), vec![], "cargo");
        let change = DependencyChange::for_group("rust-minor", vec![dep], vec![]);
        assert_eq!(change.group_name.as_deref(), Some("rust-minor"));
        assert_eq!(change.dependency_names(), vec!["serde"]);
    }
}
