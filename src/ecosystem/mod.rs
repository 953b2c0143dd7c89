//! Per-ecosystem capability traits and their registry
//!
//! Each package manager plugs into the engine through three
//! capabilities: a `FileParser` turning dependency files into a
//! dependency list, an `UpdateChecker` answering whether and how a
//! dependency can move, and a `FileUpdater` computing the file edits.
//! Capabilities are looked up by package-manager name in an
//! `EcosystemRegistry` populated at startup; lookup of an unknown name
//! fails loudly and halts the run.

mod cargo;
mod checker;
mod npm;

pub use cargo::CargoEcosystem;
pub use checker::RegistryUpdateChecker;
pub use npm::NpmEcosystem;

use crate::domain::{Dependency, DependencyFile, SecurityAdvisory, Version, VersionRange};
use crate::error::UpdaterError;
use crate::job::Cooldown;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which requirements the checker may rewrite while resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsToUnlock {
    /// Lockfile-only: no manifest requirement changes
    None,
    /// Only this dependency's own requirement
    Own,
    /// Any requirement, peers included
    All,
}

impl std::fmt::Display for RequirementsToUnlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementsToUnlock::None => write!(f, "none"),
            RequirementsToUnlock::Own => write!(f, "own"),
            RequirementsToUnlock::All => write!(f, "all"),
        }
    }
}

/// A dependency blocking a security fix, with a human explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingDependency {
    pub name: String,
    pub version: Option<String>,
    pub explanation: String,
}

/// Everything a checker needs besides the dependency and files.
#[derive(Debug, Clone, Default)]
pub struct CheckerConfig {
    /// Ranges the checker must not select versions from
    pub ignored_versions: Vec<VersionRange>,
    /// Raise AllVersionsIgnored instead of silently returning no update
    pub raise_on_ignored: bool,
    /// Advisories for the dependency under check
    pub security_advisories: Vec<SecurityAdvisory>,
    /// Target the lowest non-vulnerable version instead of the latest
    pub security_fix_mode: bool,
    /// Never rewrite manifest requirements
    pub lockfile_only: bool,
    /// Release cooldown policy, if the job configures one
    pub cooldown: Option<Cooldown>,
    /// Experiment flags passed through from the job
    pub options: BTreeMap<String, Value>,
}

/// Parses dependency files into a dependency list.
///
/// Implementations must fail with `FileNotEvaluatable` on malformed
/// input rather than returning partially-parsed garbage.
pub trait FileParser: Send + Sync {
    fn parse(&self, files: &[DependencyFile]) -> Result<Vec<Dependency>, UpdaterError>;
}

/// Answers update questions for one dependency.
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    /// The dependency under check.
    fn dependency(&self) -> &Dependency;

    /// The newest selectable version, after ignore and cooldown
    /// filtering. Fails with AllVersionsIgnored when `raise_on_ignored`
    /// is set and ignore conditions removed every candidate.
    async fn latest_version(&self) -> Result<Option<Version>, UpdaterError>;

    /// True when the dependency is already at the selectable latest.
    async fn up_to_date(&self) -> Result<bool, UpdaterError>;

    /// Whether an update is resolvable with the given unlock level.
    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, UpdaterError>;

    /// The full updated dependency list for the given unlock level,
    /// peers included, each carrying previous version/requirements.
    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<Dependency>, UpdaterError>;

    /// True when the current version is vulnerable per the advisories.
    fn vulnerable(&self) -> bool;

    /// The lowest non-vulnerable candidate, for security updates.
    async fn lowest_security_fix_version(&self) -> Result<Option<Version>, UpdaterError>;

    /// Dependencies pinning the resolution away from a security fix.
    async fn conflicting_dependencies(
        &self,
    ) -> Result<Vec<ConflictingDependency>, UpdaterError>;

    /// False only when requirements are locked and cannot be unlocked.
    fn requirements_unlocked_or_can_be(&self) -> bool;
}

/// Computes updated dependency files for a set of updated dependencies.
pub trait FileUpdater: Send + Sync {
    /// Returns the changed files only. Support files inform parsing but
    /// are excluded from the visible change set.
    fn updated_files(
        &self,
        files: &[DependencyFile],
        dependencies: &[Dependency],
    ) -> Result<Vec<DependencyFile>, UpdaterError>;
}

/// One package manager's capability set.
pub trait Ecosystem: Send + Sync {
    /// Registry key, e.g. "cargo".
    fn name(&self) -> &'static str;

    /// Manifest file names the fetcher should load.
    fn manifest_names(&self) -> &'static [&'static str];

    fn file_parser(&self) -> Box<dyn FileParser>;

    fn update_checker(
        &self,
        dependency: Dependency,
        files: Vec<DependencyFile>,
        config: CheckerConfig,
    ) -> Box<dyn UpdateChecker>;

    fn file_updater(&self) -> Box<dyn FileUpdater>;
}

/// Package-manager name → capability set, populated at startup.
#[derive(Default, Clone)]
pub struct EcosystemRegistry {
    ecosystems: BTreeMap<String, Arc<dyn Ecosystem>>,
}

impl EcosystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an ecosystem under its name. Later registrations of
    /// the same name win, which lets tests override the built-ins.
    pub fn register(&mut self, ecosystem: Arc<dyn Ecosystem>) {
        self.ecosystems
            .insert(ecosystem.name().to_string(), ecosystem);
    }

    /// Looks an ecosystem up by package-manager name. Unknown names are
    /// a run-halting error.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Ecosystem>, UpdaterError> {
        self.ecosystems
            .get(name)
            .cloned()
            .ok_or_else(|| UpdaterError::UnsupportedPackageManager {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.ecosystems.keys().map(String::as_str).collect()
    }
}
