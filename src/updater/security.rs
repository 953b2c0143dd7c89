//! Security-only updates: the smallest fix for a named vulnerability

use super::{UnlockDecision, Updater};
use crate::domain::{Dependency, DependencyChange, PullRequestRef};
use crate::error::UpdaterError;
use log::info;
use serde_json::json;

impl<'a> Updater<'a> {
    /// Processes the dependencies the job names, attempting the
    /// smallest version change that clears their advisories.
    pub(crate) async fn run_security_updates(&mut self, directory: &str) -> Result<(), UpdaterError> {
        let dependencies = self.snapshot.job_dependencies_for(self.job, directory);
        if dependencies.is_empty() {
            info!(
                "No dependencies from the job definition found in {directory}"
            );
            return Ok(());
        }

        for dependency in dependencies {
            if let Err(error) = self
                .check_and_create_security_pull_request(&dependency, directory)
                .await
            {
                self.error_handler
                    .handle_dependency_error(error, &dependency)
                    .await?;
            }
        }
        Ok(())
    }

    async fn check_and_create_security_pull_request(
        &mut self,
        dependency: &Dependency,
        directory: &str,
    ) -> Result<(), UpdaterError> {
        let files = self.snapshot.files_for(directory);
        let checker = self.update_checker_for(dependency, files.clone(), true, true)?;

        self.log_checking_for_update(dependency);

        let latest = match checker.latest_version().await {
            Ok(latest) => latest,
            Err(UpdaterError::AllVersionsIgnored { .. }) => {
                info!(
                    "All candidate versions were ignored for {}",
                    dependency.name
                );
                self.error_handler
                    .record(
                        "all_versions_ignored",
                        json!({ "dependency-name": dependency.name }),
                    )
                    .await;
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        if let Some(latest) = &latest {
            info!("Latest version is {latest}");
        }

        // A dependency that is no longer vulnerable needs no update
        if !checker.vulnerable() {
            if dependency.parsed_version().is_some() {
                info!(
                    "no security update needed as {} is no longer vulnerable",
                    dependency.name
                );
                self.error_handler
                    .record(
                        "security_update_not_needed",
                        json!({ "dependency-name": dependency.name }),
                    )
                    .await;
            } else {
                info!(
                    "The currently installed version of {} isn't known",
                    dependency.name
                );
                self.error_handler
                    .record(
                        "dependency_file_not_supported",
                        json!({ "dependency-name": dependency.name }),
                    )
                    .await;
            }
            return Ok(());
        }

        if !self.job.allowed_update(dependency, false) {
            info!(
                "All candidate versions were ignored for {}",
                dependency.name
            );
            self.error_handler
                .record(
                    "all_versions_ignored",
                    json!({ "dependency-name": dependency.name }),
                )
                .await;
            return Ok(());
        }

        if checker.up_to_date().await? {
            // Still vulnerable with no published or compatible fix
            info!(
                "No published or compatible non-vulnerable version found for {}",
                dependency.name
            );
            self.error_handler
                .record(
                    "security_update_not_found",
                    json!({
                        "dependency-name": dependency.name,
                        "dependency-version": dependency.version,
                    }),
                )
                .await;
            return Ok(());
        }

        let latest_str = latest.as_ref().map(|v| v.as_str().to_string());
        if self.pr_exists_for_latest_version(&dependency.name, directory, latest_str.as_deref()) {
            info!(
                "Pull request already exists for {} with latest version {}",
                dependency.name,
                latest_str.as_deref().unwrap_or("?")
            );
            self.error_handler
                .record(
                    "pull_request_exists_for_latest_version",
                    json!({
                        "dependency-name": dependency.name,
                        "dependency-version": latest_str,
                    }),
                )
                .await;
            return Ok(());
        }

        let unlock = match self.requirements_to_unlock(checker.as_ref()).await? {
            UnlockDecision::Unlock(unlock) => unlock,
            UnlockDecision::UpdateNotPossible => {
                return self
                    .record_security_update_not_possible(dependency, checker.as_ref())
                    .await;
            }
        };

        let updated_dependencies = checker.updated_dependencies(unlock).await?;

        // An update that leaves the advisory unfixed must not ship
        if !updated_dependencies.iter().any(|d| self.job.security_fix(d)) {
            return self
                .record_security_update_not_possible(dependency, checker.as_ref())
                .await;
        }

        let refs: Vec<PullRequestRef> = updated_dependencies
            .iter()
            .map(PullRequestRef::from_dependency)
            .collect();
        if let Some(existing) = self.existing_pull_request(&refs) {
            let humanized: Vec<String> = existing.iter().map(PullRequestRef::humanized).collect();
            info!("Pull request already exists for {}", humanized.join(", "));
            self.error_handler
                .record(
                    "pull_request_exists_for_security_update",
                    json!({ "updated-dependencies": existing }),
                )
                .await;
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

    async fn record_security_update_not_possible(
        &mut self,
        dependency: &Dependency,
        checker: &dyn crate::ecosystem::UpdateChecker,
    ) -> Result<(), UpdaterError> {
        let lowest_fix = checker
            .lowest_security_fix_version()
            .await?
            .map(|v| v.as_str().to_string());
        let conflicting = checker.conflicting_dependencies().await?;

        let latest_resolvable = lowest_fix
            .clone()
            .or_else(|| dependency.version.clone());
        if conflicting.is_empty() {
            info!(
                "The latest possible version of {} that can be installed is {}",
                dependency.name,
                latest_resolvable.as_deref().unwrap_or("?")
            );
        } else {
            let explanations: Vec<String> = conflicting
                .iter()
                .map(|c| format!("  {}", c.explanation))
                .collect();
            info!(
                "The latest possible version that can be installed is {} because of the following conflicting dependencies:\n\n{}",
                latest_resolvable.as_deref().unwrap_or("?"),
                explanations.join("\n")
            );
        }

        // A fix blocked behind a transitive pin is reported as its own
        // error type
        let error_type = if dependency.direct() {
            "security_update_not_possible"
        } else {
            "transitive_update_not_possible"
        };
        let conflicting_payload: Vec<serde_json::Value> = conflicting
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "version": c.version,
                    "explanation": c.explanation,
                })
            })
            .collect();
        self.error_handler
            .record(
                error_type,
                json!({
                    "dependency-name": dependency.name,
                    "latest-resolvable-version": latest_resolvable,
                    "lowest-non-vulnerable-version": lowest_fix,
                    "conflicting-dependencies": conflicting_payload,
                }),
            )
            .await;
        Ok(())
    }
}
