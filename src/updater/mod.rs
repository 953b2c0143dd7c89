//! The update decision loop
//!
//! The updater walks a job's directories sequentially, one decision at
//! a time: grouped dependencies first, then the ungrouped remainder, or
//! the security / refresh variants when the job asks for them. Every
//! external call is wrapped by the error handler so one bad dependency
//! never aborts the run, and the job is always marked processed exactly
//! once at the end.

mod all_versions;
mod error_handler;
mod group_update;
mod refresh;
mod security;

pub use error_handler::{classify, Classification, Disposition, ErrorHandler};

use crate::domain::{
    same_pull_request, same_pull_request_in_directory, Dependency, DependencyChange,
    DependencyFile, PullRequestRef,
};
use crate::ecosystem::{EcosystemRegistry, RequirementsToUnlock, UpdateChecker};
use crate::error::UpdaterError;
use crate::job::Job;
use crate::service::{CloseReason, Service};
use crate::snapshot::DependencySnapshot;
use error_handler::log_transport_failure;
use log::info;
use std::collections::BTreeMap;

/// The terminal action taken for one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeAction {
    Created,
    Updated,
    Closed(&'static str),
}

impl std::fmt::Display for OutcomeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeAction::Created => write!(f, "created"),
            OutcomeAction::Updated => write!(f, "updated"),
            OutcomeAction::Closed(reason) => write!(f, "closed:{reason}"),
        }
    }
}

/// One line of the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOutcome {
    /// The dependencies involved, comma-joined
    pub dependencies: String,
    pub action: OutcomeAction,
}

/// What a run did, for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub outcomes: Vec<DependencyOutcome>,
    pub error_counts: BTreeMap<String, usize>,
}

impl RunOutcome {
    /// Total reported errors.
    pub fn error_count(&self) -> usize {
        self.error_counts.values().sum()
    }
}

/// How far requirement unlocking must go for an update, or that no
/// update is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnlockDecision {
    Unlock(RequirementsToUnlock),
    UpdateNotPossible,
}

/// Drives one job run against a snapshot.
pub struct Updater<'a> {
    job: &'a Job,
    snapshot: DependencySnapshot,
    service: &'a dyn Service,
    registry: &'a EcosystemRegistry,
    error_handler: ErrorHandler<'a>,
    created_pull_requests: Vec<Vec<PullRequestRef>>,
    outcome: RunOutcome,
}

impl<'a> Updater<'a> {
    pub fn new(
        job: &'a Job,
        snapshot: DependencySnapshot,
        service: &'a dyn Service,
        registry: &'a EcosystemRegistry,
    ) -> Self {
        Self {
            job,
            snapshot,
            service,
            registry,
            error_handler: ErrorHandler::new(service, job.flags()),
            created_pull_requests: Vec::new(),
            outcome: RunOutcome::default(),
        }
    }

    /// Runs the job to completion. Run-halting errors stop the loop and
    /// are reported; either way the job is marked processed exactly
    /// once before the outcome is returned.
    pub async fn run(mut self) -> RunOutcome {
        info!("Starting update job for {}", self.job.source().repo);

        if let Err(error) = self.dispatch().await {
            let classification = classify(&error);
            log::error!("Update run halted: {error}");
            self.error_handler
                .record(classification.error_type, classification.details)
                .await;
        }

        if let Err(e) = self
            .service
            .mark_job_as_processed(self.snapshot.base_commit_sha())
            .await
        {
            log_transport_failure(&e);
        }

        self.outcome.error_counts = self.error_handler.error_counts();
        self.outcome
    }

    async fn dispatch(&mut self) -> Result<(), UpdaterError> {
        if self.job.updating_a_pull_request() {
            if let Some(group) = self.job.dependency_group_to_refresh() {
                let group = group.to_string();
                return self.refresh_group_pull_request(&group).await;
            }
            return self.refresh_version_pull_request().await;
        }

        if self.job.security_updates_only() && !self.job.target_dependencies().is_empty() {
            for directory in self.snapshot.directories() {
                self.run_security_updates(&directory).await?;
            }
            return Ok(());
        }

        for directory in self.snapshot.directories() {
            self.run_group_updates(&directory).await?;
            self.run_all_versions(&directory).await?;
        }
        Ok(())
    }

    /// The counts and outcomes recorded so far, for tests.
    #[cfg(test)]
    fn outcomes(&self) -> &[DependencyOutcome] {
        &self.outcome.outcomes
    }

    // Shared decision helpers

    fn update_checker_for(
        &self,
        dependency: &Dependency,
        files: Vec<DependencyFile>,
        raise_on_ignored: bool,
        security_fix_mode: bool,
    ) -> Result<Box<dyn UpdateChecker>, UpdaterError> {
        let ecosystem = self.registry.get(self.job.package_manager())?;
        let config = crate::ecosystem::CheckerConfig {
            ignored_versions: self.job.ignored_ranges_for(dependency),
            raise_on_ignored,
            security_advisories: self.job.advisories_for(dependency),
            security_fix_mode,
            lockfile_only: self.job.lockfile_only(),
            cooldown: self.job.cooldown().cloned(),
            options: self.job.experiments().clone(),
        };
        Ok(ecosystem.update_checker(dependency.clone(), files, config))
    }

    fn raise_on_ignored(&self, dependency: &Dependency) -> bool {
        self.job.security_updates_only() || !self.job.ignored_ranges_for(dependency).is_empty()
    }

    /// The own → all unlock cascade.
    async fn requirements_to_unlock(
        &self,
        checker: &dyn UpdateChecker,
    ) -> Result<UnlockDecision, UpdaterError> {
        let decision = if self.job.lockfile_only() || !checker.requirements_unlocked_or_can_be() {
            if checker.can_update(RequirementsToUnlock::None).await? {
                UnlockDecision::Unlock(RequirementsToUnlock::None)
            } else {
                UnlockDecision::UpdateNotPossible
            }
        } else if checker.can_update(RequirementsToUnlock::Own).await? {
            UnlockDecision::Unlock(RequirementsToUnlock::Own)
        } else if checker.can_update(RequirementsToUnlock::All).await? {
            UnlockDecision::Unlock(RequirementsToUnlock::All)
        } else {
            UnlockDecision::UpdateNotPossible
        };

        match decision {
            UnlockDecision::Unlock(unlock) => info!("Requirements to unlock {unlock}"),
            UnlockDecision::UpdateNotPossible => info!("Requirements to unlock update_not_possible"),
        }
        Ok(decision)
    }

    /// True when a single-dependency PR already targets the latest
    /// version. Directory-scoped: entries recorded against another
    /// directory do not count, entries without one apply anywhere.
    /// Checked before any `can_update` call to avoid wasted resolver
    /// work.
    fn pr_exists_for_latest_version(
        &self,
        name: &str,
        directory: &str,
        latest: Option<&str>,
    ) -> bool {
        let Some(latest) = latest else {
            return false;
        };
        self.job
            .existing_pull_requests()
            .iter()
            .filter(|pr| pr.len() == 1)
            .filter_map(|pr| pr.first())
            .filter(|pr| pr.dependency_name == name)
            .filter(|pr| {
                pr.directory
                    .as_deref()
                    .map(|d| d == directory)
                    .unwrap_or(true)
            })
            .any(|pr| pr.dependency_version.as_deref() == Some(latest))
    }

    /// Finds an existing (or just-created) PR describing exactly this
    /// updated-dependency set. Backend entries predate multi-directory
    /// jobs and compare without directories; in-run entries compare
    /// directory-scoped so sibling directories keep their own PRs.
    fn existing_pull_request(&self, refs: &[PullRequestRef]) -> Option<Vec<PullRequestRef>> {
        self.job
            .existing_pull_requests()
            .iter()
            .find(|pr| same_pull_request(pr.as_slice(), refs))
            .or_else(|| {
                self.created_pull_requests
                    .iter()
                    .find(|pr| same_pull_request_in_directory(pr.as_slice(), refs))
            })
            .cloned()
    }

    /// If a peer dependency pulled into this change could update on its
    /// own, the change is abandoned so the peer produces its own PR
    /// instead of a duplicate, overlapping one. Never applies to
    /// security updates, which cannot rely on the peer being updated.
    async fn peer_dependency_should_update_instead(
        &self,
        lead_name: &str,
        updated_dependencies: &[Dependency],
        files: &[DependencyFile],
    ) -> Result<bool, UpdaterError> {
        if self.job.security_updates_only() {
            return Ok(false);
        }

        for peer in updated_dependencies.iter().filter(|d| d.name != lead_name) {
            if self
                .existing_pull_request(&[PullRequestRef::from_dependency(peer)])
                .is_some()
            {
                return Ok(true);
            }

            let original_peer = Dependency::new(
                peer.name.clone(),
                peer.previous_version.clone(),
                peer.previous_requirements.clone(),
                peer.package_manager.clone(),
            )
            .in_directory(peer.directory.clone());
            let checker = self.update_checker_for(&original_peer, files.to_vec(), false, false)?;
            if checker.can_update(RequirementsToUnlock::Own).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // Service submission helpers; transport failures are logged, not
    // propagated

    async fn submit_create(&mut self, change: DependencyChange) {
        info!(
            "Submitting {} pull request for creation",
            change.dependency_names().join(", ")
        );
        if let Err(e) = self
            .service
            .create_pull_request(&change, self.snapshot.base_commit_sha())
            .await
        {
            log_transport_failure(&e);
        }
        self.created_pull_requests.push(change.pull_request_refs());
        self.outcome.outcomes.push(DependencyOutcome {
            dependencies: change.dependency_names().join(", "),
            action: OutcomeAction::Created,
        });
    }

    async fn submit_update(&mut self, change: DependencyChange) {
        info!(
            "Submitting {} pull request for update",
            change.dependency_names().join(", ")
        );
        if let Err(e) = self
            .service
            .update_pull_request(&change, self.snapshot.base_commit_sha())
            .await
        {
            log_transport_failure(&e);
        }
        self.outcome.outcomes.push(DependencyOutcome {
            dependencies: change.dependency_names().join(", "),
            action: OutcomeAction::Updated,
        });
    }

    async fn submit_close(&mut self, dependency_names: &[String], reason: CloseReason) {
        info!(
            "Telling backend to close pull request for {} - {}",
            dependency_names.join(", "),
            reason.humanized()
        );
        if let Err(e) = self.service.close_pull_request(dependency_names, reason).await {
            log_transport_failure(&e);
        }
        self.outcome.outcomes.push(DependencyOutcome {
            dependencies: dependency_names.join(", "),
            action: OutcomeAction::Closed(reason.as_str()),
        });
    }

    fn log_checking_for_update(&self, dependency: &Dependency) {
        info!(
            "Checking if {} {} needs updating",
            dependency.name,
            dependency.version.as_deref().unwrap_or("(no version)")
        );
        self.job.log_ignore_conditions_for(dependency);
    }

    fn log_up_to_date(&self, dependency: &Dependency) {
        info!(
            "No update needed for {} {}",
            dependency.name,
            dependency.version.as_deref().unwrap_or("(no version)")
        );
    }

    fn log_update_not_possible(&self, dependency: &Dependency) {
        info!(
            "No update possible for {} {}",
            dependency.name,
            dependency.version.as_deref().unwrap_or("(no version)")
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support;
