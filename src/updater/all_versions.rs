//! Ungrouped version updates: one PR per dependency

use super::{UnlockDecision, Updater};
use crate::domain::{Dependency, DependencyChange, PullRequestRef};
use crate::error::UpdaterError;
use log::info;

impl<'a> Updater<'a> {
    /// Iterates the directory's ungrouped, allowed dependencies and
    /// decides each one in turn. Errors are classified per dependency;
    /// only run-halting classes stop the loop.
    pub(crate) async fn run_all_versions(&mut self, directory: &str) -> Result<(), UpdaterError> {
        info!("Checking all dependencies for version updates in {directory}");

        let all_count = self.snapshot.dependencies_for(directory).len();
        let candidates: Vec<Dependency> = self
            .snapshot
            .ungrouped_dependencies(directory)
            .into_iter()
            .filter(|d| self.job.allowed_update(d, false))
            .collect();

        if all_count > 0 && candidates.is_empty() {
            info!("Found no dependencies to update after filtering allowed updates");
            return Ok(());
        }

        for dependency in candidates {
            if let Err(error) = self
                .check_and_create_pull_request(&dependency, directory)
                .await
            {
                self.error_handler
                    .handle_dependency_error(error, &dependency)
                    .await?;
            }
            self.snapshot
                .add_handled_dependencies(directory, [dependency.name.clone()]);
        }
        Ok(())
    }

    async fn check_and_create_pull_request(
        &mut self,
        dependency: &Dependency,
        directory: &str,
    ) -> Result<(), UpdaterError> {
        let files = self.snapshot.files_for(directory);
        let checker = self.update_checker_for(
            dependency,
            files.clone(),
            self.raise_on_ignored(dependency),
            false,
        )?;

        self.log_checking_for_update(dependency);

        let latest = match checker.latest_version().await {
            Ok(latest) => latest,
            Err(UpdaterError::AllVersionsIgnored { .. }) => {
                info!("All updates for {} were ignored", dependency.name);
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        match &latest {
            Some(latest) => info!("Latest version is {latest}"),
            None => {
                info!("No versions found for {}", dependency.name);
                return Ok(());
            }
        }

        if checker.up_to_date().await? {
            self.log_up_to_date(dependency);
            return Ok(());
        }

        // The short-circuit happens before any can_update call so no
        // resolver work is wasted on a change that already has a PR
        let latest_str = latest.as_ref().map(|v| v.as_str().to_string());
        if self.pr_exists_for_latest_version(&dependency.name, directory, latest_str.as_deref()) {
            info!(
                "Pull request already exists for {} with latest version {}",
                dependency.name,
                latest_str.as_deref().unwrap_or("?")
            );
            return Ok(());
        }

        let unlock = match self.requirements_to_unlock(checker.as_ref()).await? {
            UnlockDecision::Unlock(unlock) => unlock,
            UnlockDecision::UpdateNotPossible => {
                self.log_update_not_possible(dependency);
                return Ok(());
            }
        };

        let updated_dependencies = checker.updated_dependencies(unlock).await?;
        if updated_dependencies.is_empty() {
            return Ok(());
        }

        let refs: Vec<PullRequestRef> = updated_dependencies
            .iter()
            .map(PullRequestRef::from_dependency)
            .collect();
        if let Some(existing) = self.existing_pull_request(&refs) {
            let humanized: Vec<String> =
                existing.iter().map(PullRequestRef::humanized).collect();
            info!("Pull request already exists for {}", humanized.join(", "));
            return Ok(());
        }

        if self
            .peer_dependency_should_update_instead(&dependency.name, &updated_dependencies, &files)
            .await?
        {
            info!(
                "No update possible for {} {} (peer dependency can be updated)",
                dependency.name,
                dependency.version.as_deref().unwrap_or("?")
            );
            return Ok(());
        }

        let ecosystem = self.registry.get(self.job.package_manager())?;
        let updated_files = ecosystem
            .file_updater()
            .updated_files(&files, &updated_dependencies)?;
        let change = DependencyChange::new(updated_dependencies, updated_files);
        self.submit_create(change).await;
        Ok(())
    }
}
