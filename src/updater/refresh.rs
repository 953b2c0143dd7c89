//! Refreshing existing pull requests
//!
//! A refresh re-evaluates the dependencies behind an open PR. If the
//! diff is still the right one the PR is updated (a rebase); if the
//! project moved on the PR is superseded or closed.

use super::{UnlockDecision, Updater};
use crate::domain::{Dependency, DependencyChange, PullRequestRef, same_pull_request};
use crate::error::UpdaterError;
use crate::service::CloseReason;
use log::info;

impl<'a> Updater<'a> {
    /// Refreshes the single-or-multi dependency PR named by the job.
    pub(crate) async fn refresh_version_pull_request(&mut self) -> Result<(), UpdaterError> {
        info!("Starting PR update job for {}", self.job.source().repo);

        let target_names: Vec<String> = self
            .job
            .target_dependencies()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        if target_names.is_empty() {
            info!("Refresh job has no dependencies; nothing to do");
            return Ok(());
        }

        // Find the directory still containing the lead dependency
        let directory = self.snapshot.directories().into_iter().find(|dir| {
            !self.snapshot.job_dependencies_for(self.job, dir).is_empty()
        });
        let Some(directory) = directory else {
            // Everything we changed has left the project
            let names = self.job.target_dependencies().to_vec();
            self.submit_close(&names, CloseReason::DependencyRemoved).await;
            return Ok(());
        };

        let dependencies = self.snapshot.job_dependencies_for(self.job, &directory);
        if dependencies.len() != target_names.len() {
            // At least one dependency of the PR has been removed
            let names = self.job.target_dependencies().to_vec();
            self.submit_close(&names, CloseReason::DependencyRemoved).await;
            return Ok(());
        }

        let lead_name = &target_names[0];
        let Some(lead) = dependencies
            .iter()
            .find(|d| d.name.to_lowercase() == *lead_name)
            .cloned()
        else {
            let names = self.job.target_dependencies().to_vec();
            self.submit_close(&names, CloseReason::DependencyRemoved).await;
            return Ok(());
        };

        if let Err(error) = self.check_and_update_pull_request(&lead, &directory).await {
            self.error_handler.handle_dependency_error(error, &lead).await?;
        }
        Ok(())
    }

    async fn check_and_update_pull_request(
        &mut self,
        lead: &Dependency,
        directory: &str,
    ) -> Result<(), UpdaterError> {
        let files = self.snapshot.files_for(directory);
        let checker =
            self.update_checker_for(lead, files.clone(), self.raise_on_ignored(lead), false)?;

        self.log_checking_for_update(lead);

        match checker.latest_version().await {
            Ok(Some(latest)) => info!("Latest version is {latest}"),
            Ok(None) => {}
            Err(UpdaterError::AllVersionsIgnored { .. }) => {
                info!("All updates for {} were ignored", lead.name);
                return Ok(());
            }
            Err(error) => return Err(error),
        }

        if checker.up_to_date().await? {
            let names = self.job.target_dependencies().to_vec();
            self.submit_close(&names, CloseReason::UpToDate).await;
            return Ok(());
        }

        let unlock = match self.requirements_to_unlock(checker.as_ref()).await? {
            UnlockDecision::Unlock(unlock) => unlock,
            UnlockDecision::UpdateNotPossible => {
                let names = self.job.target_dependencies().to_vec();
                self.submit_close(&names, CloseReason::UpdateNoLongerPossible)
                    .await;
                return Ok(());
            }
        };

        let updated_dependencies =
            filter_unrelated_and_unchanged(checker.updated_dependencies(unlock).await?, &lead.name);

        let ecosystem = self.registry.get(self.job.package_manager())?;
        let updated_files = ecosystem
            .file_updater()
            .updated_files(&files, &updated_dependencies)?;

        let mut updated_names: Vec<String> = updated_dependencies
            .iter()
            .map(|d| d.name.to_lowercase())
            .collect();
        updated_names.sort();
        let mut target_names: Vec<String> = self
            .job
            .target_dependencies()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        target_names.sort();

        let refs: Vec<PullRequestRef> = updated_dependencies
            .iter()
            .map(PullRequestRef::from_dependency)
            .collect();

        if updated_names != target_names {
            // The update now touches a different dependency set; the
            // open PR no longer describes it
            let names = self.job.target_dependencies().to_vec();
            self.submit_close(&names, CloseReason::DependenciesChanged).await;
            self.submit_create(DependencyChange::new(updated_dependencies, updated_files))
                .await;
        } else if self.existing_pull_request(&refs).is_some() {
            // Same versions as the open PR: rebase it
            self.submit_update(DependencyChange::new(updated_dependencies, updated_files))
                .await;
        } else {
            // A newer version exists: supersede the open PR
            self.submit_create(DependencyChange::new(updated_dependencies, updated_files))
                .await;
        }
        Ok(())
    }

    /// Refreshes a group PR, including dynamic `parent/dep` subgroups.
    pub(crate) async fn refresh_group_pull_request(
        &mut self,
        group_name: &str,
    ) -> Result<(), UpdaterError> {
        info!(
            "Starting group PR update job for '{group_name}' in {}",
            self.job.source().repo
        );

        let mut refreshed = false;
        for directory in self.snapshot.directories() {
            let Some(group) = self.snapshot.find_group(&directory, group_name).cloned() else {
                continue;
            };
            refreshed = true;

            let change = self.compile_group_change(&group, &directory).await?;
            self.snapshot.mark_group_handled(self.job, &group.name);

            let Some(change) = change else {
                let names: Vec<String> = group
                    .dependencies()
                    .iter()
                    .map(|d| d.name.clone())
                    .collect();
                self.submit_close(&names, CloseReason::UpToDate).await;
                continue;
            };

            let refs = change.pull_request_refs();
            let matches_existing = self
                .job
                .existing_group_pull_requests()
                .iter()
                .filter(|pr| pr.dependency_group_name == group.name)
                .any(|pr| same_pull_request(&pr.dependencies, &refs));
            if matches_existing {
                self.submit_update(change).await;
            } else {
                self.submit_create(change).await;
            }
        }

        if !refreshed {
            info!("Group '{group_name}' matches no dependencies in any directory");
        }
        Ok(())
    }

}

/// Drops collaborator entries that did not actually change: direct
/// dependencies whose requirements stayed put, and transitive ones
/// whose version stayed put. The lead dependency always survives.
fn filter_unrelated_and_unchanged(
    updated_dependencies: Vec<Dependency>,
    lead_name: &str,
) -> Vec<Dependency> {
    updated_dependencies
        .into_iter()
        .filter(|d| {
            if d.name == lead_name {
                return true;
            }
            if d.direct() && d.requirements == d.previous_requirements {
                return false;
            }
            d.version != d.previous_version
        })
        .collect()
}
