//! Per-directory dependency snapshot and handled bookkeeping
//!
//! The snapshot parses every directory's dependency files once, owns a
//! group engine per directory, and tracks which dependency names have
//! already been handled in this run. Every query and mutation takes the
//! directory explicitly; handled sets are monotonic within a run and
//! directories never leak into each other.

use crate::domain::{Dependency, DependencyFile};
use crate::ecosystem::EcosystemRegistry;
use crate::error::UpdaterError;
use crate::group::{DependencyGroup, DependencyGroupEngine};
use crate::job::Job;
use std::collections::{BTreeMap, BTreeSet};

/// Parsed dependency state for one job run.
#[derive(Debug)]
pub struct DependencySnapshot {
    base_commit_sha: String,
    dependency_files: Vec<DependencyFile>,
    dependencies: BTreeMap<String, Vec<Dependency>>,
    engines: BTreeMap<String, DependencyGroupEngine>,
    handled: BTreeMap<String, BTreeSet<String>>,
    /// (group, directory, name) triples, tracked when specificity
    /// enforcement is on
    group_handled: BTreeSet<(String, String, String)>,
    group_specificity_enforcement: bool,
}

impl DependencySnapshot {
    /// Parses the dependency files and assigns groups per directory.
    /// A malformed manifest is fatal for the whole run and propagates.
    pub fn create(
        job: &Job,
        dependency_files: Vec<DependencyFile>,
        base_commit_sha: impl Into<String>,
        registry: &EcosystemRegistry,
    ) -> Result<Self, UpdaterError> {
        let ecosystem = registry.get(job.package_manager())?;
        let parser = ecosystem.file_parser();

        let mut dependencies: BTreeMap<String, Vec<Dependency>> = BTreeMap::new();
        let mut engines = BTreeMap::new();
        let mut handled = BTreeMap::new();

        for directory in job.directories() {
            let files: Vec<DependencyFile> = dependency_files
                .iter()
                .filter(|f| f.directory == directory)
                .cloned()
                .collect();
            let mut parsed = parser.parse(&files)?;
            for dep in &mut parsed {
                dep.directory = directory.clone();
            }

            let mut engine =
                DependencyGroupEngine::from_job_config(job.group_configs(), job.flags());
            engine.assign_to_groups(&parsed);

            dependencies.insert(directory.clone(), parsed);
            engines.insert(directory.clone(), engine);
            handled.insert(directory.clone(), BTreeSet::new());
        }

        Ok(Self {
            base_commit_sha: base_commit_sha.into(),
            dependency_files,
            dependencies,
            engines,
            handled,
            group_handled: BTreeSet::new(),
            group_specificity_enforcement: job.flags().group_specificity_enforcement,
        })
    }

    pub fn base_commit_sha(&self) -> &str {
        &self.base_commit_sha
    }

    /// All dependency files, every directory.
    pub fn dependency_files(&self) -> &[DependencyFile] {
        &self.dependency_files
    }

    /// The dependency files of one directory.
    pub fn files_for(&self, directory: &str) -> Vec<DependencyFile> {
        self.dependency_files
            .iter()
            .filter(|f| f.directory == directory)
            .cloned()
            .collect()
    }

    /// Directories in snapshot order.
    pub fn directories(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    /// Parsed dependencies of one directory.
    pub fn dependencies_for(&self, directory: &str) -> &[Dependency] {
        self.dependencies
            .get(directory)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dependencies the job names explicitly (security updates and
    /// refreshes), matched case-insensitively.
    pub fn job_dependencies_for(&self, job: &Job, directory: &str) -> Vec<Dependency> {
        let targets: Vec<String> = job
            .target_dependencies()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        self.dependencies_for(directory)
            .iter()
            .filter(|d| targets.contains(&d.name.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Dependencies passing the job's allow rules. In security-only
    /// mode this bypasses the default direct-only restriction for
    /// advisory-named sub-dependencies.
    pub fn allowed_dependencies_for(&self, job: &Job, directory: &str) -> Vec<Dependency> {
        self.dependencies_for(directory)
            .iter()
            .filter(|d| job.allowed_update(d, false))
            .cloned()
            .collect()
    }

    /// Names already handled in this directory.
    pub fn handled_dependencies(&self, directory: &str) -> BTreeSet<String> {
        self.handled.get(directory).cloned().unwrap_or_default()
    }

    /// Marks names handled in one directory only.
    pub fn add_handled_dependencies<I, S>(&mut self, directory: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = self.handled.entry(directory.to_string()).or_default();
        for name in names {
            set.insert(name.into());
        }
    }

    /// Marks names handled in one directory, attributed to a group.
    /// The flat set always updates; the attribution triple is only
    /// recorded under specificity enforcement, where "handled under a
    /// different group" must remain distinguishable.
    pub fn add_handled_dependencies_with_group<I, S>(
        &mut self,
        directory: &str,
        names: I,
        group_name: &str,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.group_specificity_enforcement {
                self.group_handled.insert((
                    group_name.to_string(),
                    directory.to_string(),
                    name.clone(),
                ));
            }
            self.handled
                .entry(directory.to_string())
                .or_default()
                .insert(name);
        }
    }

    /// True only when the name was handled under this group in this
    /// directory. Returns false when the name was handled under a
    /// different group, even though the flat set contains it.
    pub fn dependency_handled_with_group(
        &self,
        directory: &str,
        name: &str,
        group_name: &str,
    ) -> bool {
        self.group_handled.contains(&(
            group_name.to_string(),
            directory.to_string(),
            name.to_string(),
        ))
    }

    /// Marks every dependency currently assigned to the group handled
    /// in every directory the job spans, so a sibling directory does
    /// not re-evaluate the same logical dependency. Existing group PR
    /// entries for the group are honored per directory, or across all
    /// directories when the cross-directory flag is on.
    pub fn mark_group_handled(&mut self, job: &Job, group_name: &str) {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for engine in self.engines.values() {
            if let Some(group) = engine.find_group(group_name) {
                names.extend(group.dependencies().iter().map(|d| d.name.clone()));
            }
        }

        let directories = self.directories();
        for directory in &directories {
            let handled: Vec<String> = names.iter().cloned().collect();
            self.add_handled_dependencies_with_group(directory, handled, group_name);
        }

        let cross_directory = job.flags().cross_directory_existing_prs;
        for group_pr in job.existing_group_pull_requests() {
            if group_pr.dependency_group_name != group_name {
                continue;
            }
            for entry in &group_pr.dependencies {
                if cross_directory {
                    for directory in &directories {
                        self.add_handled_dependencies_with_group(
                            directory,
                            [entry.dependency_name.clone()],
                            group_name,
                        );
                    }
                } else {
                    let directory = entry.directory.clone().unwrap_or_else(|| "/".to_string());
                    self.add_handled_dependencies_with_group(
                        &directory,
                        [entry.dependency_name.clone()],
                        group_name,
                    );
                }
            }
        }
    }

    /// Groups assigned for one directory.
    pub fn groups_for(&self, directory: &str) -> &[DependencyGroup] {
        self.engines
            .get(directory)
            .map(|e| e.groups())
            .unwrap_or(&[])
    }

    /// Finds a group by (possibly composite) name in one directory.
    pub fn find_group(&self, directory: &str, name: &str) -> Option<&DependencyGroup> {
        self.engines.get(directory).and_then(|e| e.find_group(name))
    }

    /// Dependencies matching no group in this directory, minus the
    /// handled set.
    pub fn ungrouped_dependencies(&self, directory: &str) -> Vec<Dependency> {
        let handled = self.handled.get(directory);
        self.engines
            .get(directory)
            .map(|e| e.ungrouped_dependencies())
            .unwrap_or(&[])
            .iter()
            .filter(|d| handled.map(|h| !h.contains(&d.name)).unwrap_or(true))
            .cloned()
            .collect()
    }
}
