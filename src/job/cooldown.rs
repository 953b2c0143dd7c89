//! Release cooldown windows
//!
//! A cooldown keeps freshly published versions out of candidate
//! selection for a configurable number of days, with separate windows
//! per semver update type and include/exclude name globs.

use super::definition::CooldownConfig;
use crate::domain::UpdateType;
use crate::wildcard;
use chrono::{DateTime, Duration, Utc};

/// Resolved cooldown policy.
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    default_days: u32,
    semver_major_days: Option<u32>,
    semver_minor_days: Option<u32>,
    semver_patch_days: Option<u32>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Cooldown {
    pub fn from_config(config: &CooldownConfig) -> Self {
        Self {
            default_days: config.default_days,
            semver_major_days: config.semver_major_days,
            semver_minor_days: config.semver_minor_days,
            semver_patch_days: config.semver_patch_days,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
        }
    }

    /// The window for an update type, falling back to the default.
    pub fn days_for(&self, update_type: UpdateType) -> u32 {
        let specific = match update_type {
            UpdateType::SemverMajor => self.semver_major_days,
            UpdateType::SemverMinor => self.semver_minor_days,
            UpdateType::SemverPatch => self.semver_patch_days,
        };
        specific.unwrap_or(self.default_days)
    }

    /// Whether the policy covers this dependency name. A non-empty
    /// include list restricts coverage to matches; excludes always win.
    pub fn applies_to(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| wildcard::matches(p, name)) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        self.include.iter().any(|p| wildcard::matches(p, name))
    }

    /// True when a release is still inside its cooldown window.
    pub fn in_cooldown(
        &self,
        name: &str,
        released_at: DateTime<Utc>,
        now: DateTime<Utc>,
        update_type: UpdateType,
    ) -> bool {
        if !self.applies_to(name) {
            return false;
        }
        let days = self.days_for(update_type);
        if days == 0 {
            return false;
        }
        released_at > now - Duration::days(i64::from(days))
    }
}
