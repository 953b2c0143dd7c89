//! Registry-backed update checker
//!
//! The built-in ecosystems share this checker: candidates come from a
//! registry `VersionSource`, get filtered by prerelease policy, ignore
//! ranges and cooldown, and the update is realized by rewriting the
//! manifest requirement. Ecosystems with real resolvers replace this
//! with their own `UpdateChecker` implementation.

use super::{CheckerConfig, ConflictingDependency, RequirementsToUnlock, UpdateChecker};
use crate::domain::{Dependency, Requirement, Version};
use crate::error::UpdaterError;
use crate::registry::VersionSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

pub struct RegistryUpdateChecker {
    dependency: Dependency,
    config: CheckerConfig,
    source: Arc<dyn VersionSource>,
    now: DateTime<Utc>,
}

impl RegistryUpdateChecker {
    pub fn new(
        dependency: Dependency,
        config: CheckerConfig,
        source: Arc<dyn VersionSource>,
    ) -> Self {
        Self {
            dependency,
            config,
            source,
            now: Utc::now(),
        }
    }

    /// Pins the clock, for cooldown tests.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Fetches and filters candidates: unparsable versions are skipped
    /// with a debug log, prereleases only count when the current
    /// version is itself a prerelease, and cooled-down releases are
    /// dropped.
    async fn candidates(&self) -> Result<Vec<Version>, UpdaterError> {
        let published = self.source.versions(&self.dependency.name).await?;
        let current = self.dependency.parsed_version();
        let current_is_prerelease = current.as_ref().map(Version::is_prerelease).unwrap_or(false);

        let mut candidates = Vec::new();
        for info in published {
            let Some(version) = Version::parse(&info.version) else {
                debug!(
                    "Skipping unparsable version '{}' of {}",
                    info.version, self.dependency.name
                );
                continue;
            };
            if version.is_prerelease() && !current_is_prerelease {
                continue;
            }
            if let (Some(cooldown), Some(released_at), Some(current)) =
                (&self.config.cooldown, info.released_at, &current)
            {
                let update_type = version.update_type_from(current);
                if version > *current
                    && cooldown.in_cooldown(&self.dependency.name, released_at, self.now, update_type)
                {
                    continue;
                }
            }
            candidates.push(version);
        }
        Ok(candidates)
    }

    fn ignored(&self, version: &Version) -> bool {
        self.config
            .ignored_versions
            .iter()
            .any(|range| range.satisfied_by(version))
    }

    /// The version an update would move to: the latest candidate, or
    /// in security-fix mode the lowest non-vulnerable one.
    async fn target_version(&self) -> Result<Option<Version>, UpdaterError> {
        if self.config.security_fix_mode {
            self.lowest_security_fix_version().await
        } else {
            self.latest_version().await
        }
    }

    fn rewrite_requirements(&self, target: &Version) -> Vec<Requirement> {
        self.dependency
            .requirements
            .iter()
            .map(|req| {
                let mut updated = req.clone();
                if let Some(range) = &req.requirement {
                    updated.requirement = Some(rewrite_requirement_string(range, target));
                }
                updated
            })
            .collect()
    }
}

/// Replaces the version part of a requirement string, preserving the
/// operator prefix (`^1.2.3` stays caret-shaped). Compound ranges are
/// replaced whole since the old bounds no longer apply.
fn rewrite_requirement_string(requirement: &str, target: &Version) -> String {
    let trimmed = requirement.trim();
    let split_at = trimmed
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let prefix = &trimmed[..split_at];
    if trimmed.contains(',') {
        return target.as_str().to_string();
    }
    format!("{prefix}{target}")
}

#[async_trait]
impl UpdateChecker for RegistryUpdateChecker {
    fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    async fn latest_version(&self) -> Result<Option<Version>, UpdaterError> {
        let candidates = self.candidates().await?;
        let current = self.dependency.parsed_version();

        let above_current: Vec<&Version> = candidates
            .iter()
            .filter(|v| current.as_ref().map(|cur| *v > cur).unwrap_or(true))
            .collect();
        let selectable: Vec<&Version> = above_current
            .iter()
            .copied()
            .filter(|v| !self.ignored(v))
            .collect();

        if self.config.raise_on_ignored && !above_current.is_empty() && selectable.is_empty() {
            return Err(UpdaterError::all_versions_ignored(&self.dependency.name));
        }

        let latest_selectable = selectable.into_iter().max().cloned();
        // Fall back to the newest non-ignored candidate overall so
        // up-to-date dependencies still report their latest version
        let latest_any = candidates
            .iter()
            .filter(|v| !self.ignored(v))
            .max()
            .cloned();
        Ok(latest_selectable.or(latest_any))
    }

    async fn up_to_date(&self) -> Result<bool, UpdaterError> {
        let Some(latest) = self.latest_version().await? else {
            return Ok(true);
        };
        match self.dependency.parsed_version() {
            Some(current) => Ok(current >= latest),
            None => Ok(false),
        }
    }

    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, UpdaterError> {
        let Some(target) = self.target_version().await? else {
            return Ok(false);
        };
        if let Some(current) = self.dependency.parsed_version() {
            if target <= current {
                return Ok(false);
            }
        }

        Ok(match unlock {
            // With no lockfile there is nothing to move without a
            // requirement change
            RequirementsToUnlock::None => false,
            RequirementsToUnlock::Own => {
                self.dependency.direct() && !self.config.lockfile_only
            }
            RequirementsToUnlock::All => !self.config.lockfile_only,
        })
    }

    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<Dependency>, UpdaterError> {
        let Some(target) = self.target_version().await? else {
            return Ok(Vec::new());
        };
        if !self.can_update(unlock).await? {
            return Ok(Vec::new());
        }

        let mut updated = self.dependency.clone();
        updated.previous_version = self.dependency.version.clone();
        updated.previous_requirements = self.dependency.requirements.clone();
        updated.version = Some(target.as_str().to_string());
        if !self.config.lockfile_only {
            updated.requirements = self.rewrite_requirements(&target);
        }
        Ok(vec![updated])
    }

    fn vulnerable(&self) -> bool {
        let versions = self.dependency.all_versions();
        if versions.is_empty() {
            return false;
        }
        self.config
            .security_advisories
            .iter()
            .any(|adv| versions.iter().any(|v| adv.vulnerable(v)))
    }

    async fn lowest_security_fix_version(&self) -> Result<Option<Version>, UpdaterError> {
        let candidates = self.candidates().await?;
        let current = self.dependency.parsed_version();
        Ok(candidates
            .iter()
            .filter(|v| current.as_ref().map(|cur| *v > cur).unwrap_or(true))
            .filter(|v| !self.ignored(v))
            .filter(|v| {
                !self
                    .config
                    .security_advisories
                    .iter()
                    .any(|adv| adv.vulnerable(v))
            })
            .min()
            .cloned())
    }

    async fn conflicting_dependencies(
        &self,
    ) -> Result<Vec<ConflictingDependency>, UpdaterError> {
        // The registry checker has no resolver, so nothing can pin the
        // fix away
        Ok(Vec::new())
    }

    fn requirements_unlocked_or_can_be(&self) -> bool {
        !self.config.lockfile_only
    }
}
