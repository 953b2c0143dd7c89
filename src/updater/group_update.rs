//! Grouped updates: one PR per dependency group

use super::{UnlockDecision, Updater};
use crate::domain::{same_pull_request, Dependency, DependencyChange, DependencyFile};
use crate::error::UpdaterError;
use crate::group::DependencyGroup;
use log::info;
use std::collections::BTreeMap;

impl<'a> Updater<'a> {
    /// Runs every non-empty group assigned in this directory, marking
    /// each group's dependencies handled so the ungrouped pass and
    /// sibling directories skip them.
    pub(crate) async fn run_group_updates(&mut self, directory: &str) -> Result<(), UpdaterError> {
        let groups: Vec<DependencyGroup> = self.snapshot.groups_for(directory).to_vec();
        for group in groups {
            if group.is_empty() {
                continue;
            }
            if group.applies_to.as_deref() == Some("security-updates")
                && !self.job.security_updates_only()
            {
                continue;
            }
            self.run_group_update(&group, directory).await?;
        }
        Ok(())
    }

    async fn run_group_update(
        &mut self,
        group: &DependencyGroup,
        directory: &str,
    ) -> Result<(), UpdaterError> {
        info!("Starting update group for '{}'", group.name);
        let change = match self.compile_group_change(group, directory).await {
            Ok(change) => change,
            Err(error) => {
                // Attribute group-level failures to the lead dependency
                let lead = group.dependencies().first().cloned();
                if let Some(lead) = lead {
                    self.error_handler
                        .handle_dependency_error(error, &lead)
                        .await?;
                } else {
                    return Err(error);
                }
                None
            }
        };

        // Handled bookkeeping happens whether or not a PR results, so
        // the same logical dependency is not re-evaluated elsewhere
        self.snapshot.mark_group_handled(self.job, &group.name);

        let Some(change) = change else {
            info!("Nothing to update for group '{}'", group.name);
            return Ok(());
        };

        let refs = change.pull_request_refs();
        let duplicate = self
            .job
            .existing_group_pull_requests()
            .iter()
            .filter(|pr| pr.dependency_group_name == group.name)
            .any(|pr| same_pull_request(&pr.dependencies, &refs));
        if duplicate {
            info!(
                "Pull request already exists for group '{}' with the same dependencies",
                group.name
            );
            return Ok(());
        }

        info!("Creating a pull request for '{}'", group.name);
        self.submit_create(change).await;
        Ok(())
    }

    /// Compiles every eligible dependency of a group into one change,
    /// iterating over the file state so later dependencies see earlier
    /// edits. A dependency that fails is reported and skipped; the
    /// group continues without it.
    pub(super) async fn compile_group_change(
        &mut self,
        group: &DependencyGroup,
        directory: &str,
    ) -> Result<Option<DependencyChange>, UpdaterError> {
        let ecosystem = self.registry.get(self.job.package_manager())?;
        let mut current_files = self.snapshot.files_for(directory);
        let mut all_updated: Vec<Dependency> = Vec::new();
        let mut changed_files: BTreeMap<(String, String), DependencyFile> = BTreeMap::new();

        for dependency in group.dependencies().to_vec() {
            if !self.job.allowed_update(&dependency, false) {
                continue;
            }
            if self
                .snapshot
                .dependency_handled_with_group(directory, &dependency.name, &group.name)
            {
                continue;
            }

            let updated = match self
                .compile_updates_for(&dependency, &current_files, group)
                .await
            {
                Ok(updated) => updated,
                Err(error) => {
                    self.error_handler
                        .handle_dependency_error(error, &dependency)
                        .await?;
                    Vec::new()
                }
            };

            // First update to a name wins within the group
            let fresh: Vec<Dependency> = updated
                .into_iter()
                .filter(|d| !all_updated.iter().any(|u| u.name == d.name))
                .collect();
            if fresh.is_empty() {
                continue;
            }

            let updated_files = ecosystem.file_updater().updated_files(&current_files, &fresh)?;
            for updated_file in updated_files {
                let key = (updated_file.name.clone(), updated_file.directory.clone());
                if let Some(slot) = current_files
                    .iter_mut()
                    .find(|f| f.name == updated_file.name && f.directory == updated_file.directory)
                {
                    *slot = updated_file.clone();
                }
                changed_files.insert(key, updated_file);
            }
            all_updated.extend(fresh);
        }

        if all_updated.is_empty() {
            return Ok(None);
        }
        Ok(Some(DependencyChange::for_group(
            &group.name,
            all_updated,
            changed_files.into_values().collect(),
        )))
    }

    async fn compile_updates_for(
        &self,
        dependency: &Dependency,
        files: &[DependencyFile],
        group: &DependencyGroup,
    ) -> Result<Vec<Dependency>, UpdaterError> {
        let checker = self.update_checker_for(
            dependency,
            files.to_vec(),
            self.raise_on_ignored(dependency),
            false,
        )?;

        self.log_checking_for_update(dependency);

        let latest = match checker.latest_version().await {
            Ok(Some(latest)) => latest,
            Ok(None) => return Ok(Vec::new()),
            Err(UpdaterError::AllVersionsIgnored { .. }) => {
                info!("All updates for {} were ignored", dependency.name);
                return Ok(Vec::new());
            }
            Err(error) => return Err(error),
        };
        info!("Latest version is {latest}");

        if checker.up_to_date().await? {
            self.log_up_to_date(dependency);
            return Ok(Vec::new());
        }

        // A jump bigger than the group's update-types belongs in an
        // individual PR or another group
        if !group_admits_update_type(group, dependency, &latest) {
            info!(
                "Update of {} to {} is outside the group's update-types",
                dependency.name, latest
            );
            return Ok(Vec::new());
        }

        let unlock = match self.requirements_to_unlock(checker.as_ref()).await? {
            UnlockDecision::Unlock(unlock) => unlock,
            UnlockDecision::UpdateNotPossible => {
                self.log_update_not_possible(dependency);
                return Ok(Vec::new());
            }
        };

        checker.updated_dependencies(unlock).await
    }
}

/// Checks the group's `update-types` rule against the candidate jump.
/// Accepts both the bare (`major`) and prefixed (`semver-major`) forms.
fn group_admits_update_type(
    group: &DependencyGroup,
    dependency: &Dependency,
    latest: &crate::domain::Version,
) -> bool {
    if group.rules.update_types.is_empty() {
        return true;
    }
    let Some(current) = dependency.parsed_version() else {
        return true;
    };
    let update_type = latest.update_type_from(&current);
    group.rules.update_types.iter().any(|t| {
        t == update_type.as_group_rule_str() || t == update_type.as_config_str()
    })
}
