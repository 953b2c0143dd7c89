//! Scripted ecosystem for decision-loop tests
//!
//! The mock ecosystem parses a `deps.json` file (a JSON array of
//! dependencies) and answers checker questions from per-dependency
//! scripts, recording every call so tests can assert what the loop
//! consulted.

use crate::domain::{Dependency, DependencyFile, PullRequestRef, Requirement, Version};
use crate::ecosystem::{
    CheckerConfig, ConflictingDependency, Ecosystem, EcosystemRegistry, FileParser, FileUpdater,
    RequirementsToUnlock, UpdateChecker,
};
use crate::error::UpdaterError;
use crate::job::{
    AllowedUpdate, GroupConfig, GroupPullRequest, GroupRules, IgnoreCondition, Job, JobConfig,
    JobDefinition, SourceConfig,
};
use crate::snapshot::DependencySnapshot;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// How a scripted checker fails, if at all.
#[derive(Debug, Clone)]
enum Failure {
    NotResolvable(String),
    RateLimited,
    AllVersionsIgnored,
}

/// Scripted answers for one dependency's checker.
#[derive(Debug, Clone)]
pub struct Script {
    latest: Option<String>,
    up_to_date: bool,
    can_update_own: bool,
    can_update_all: bool,
    own_result: Option<Vec<Dependency>>,
    all_result: Option<Vec<Dependency>>,
    vulnerable: bool,
    lowest_fix: Option<String>,
    conflicting: Vec<ConflictingDependency>,
    failure: Option<Failure>,
}

impl Script {
    /// An update to `latest` is available through the own unlock.
    pub fn update_available(latest: &str) -> Self {
        Self {
            latest: Some(latest.to_string()),
            up_to_date: false,
            can_update_own: true,
            can_update_all: true,
            own_result: None,
            all_result: None,
            vulnerable: false,
            lowest_fix: None,
            conflicting: Vec::new(),
            failure: None,
        }
    }

    /// Already at the latest version.
    pub fn up_to_date(latest: &str) -> Self {
        Self {
            up_to_date: true,
            can_update_own: false,
            can_update_all: false,
            ..Self::update_available(latest)
        }
    }

    /// latest_version raises the all-versions-ignored signal.
    pub fn all_versions_ignored() -> Self {
        Self {
            failure: Some(Failure::AllVersionsIgnored),
            ..Self::update_available("9.9.9")
        }
    }

    /// latest_version fails with a resolution error.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(Failure::NotResolvable(message.to_string())),
            ..Self::update_available("9.9.9")
        }
    }

    /// latest_version hits a rate limit (run-halting).
    pub fn rate_limited() -> Self {
        Self {
            failure: Some(Failure::RateLimited),
            ..Self::update_available("9.9.9")
        }
    }

    /// The own unlock is not enough.
    pub fn without_own_unlock(mut self) -> Self {
        self.can_update_own = false;
        self
    }

    /// No unlock level resolves an update.
    pub fn update_not_possible(mut self) -> Self {
        self.can_update_own = false;
        self.can_update_all = false;
        self
    }

    /// The updated-dependency list for the all unlock.
    pub fn with_all_unlock_result(mut self, dependencies: Vec<Dependency>) -> Self {
        self.all_result = Some(dependencies);
        self.can_update_all = true;
        self
    }

    /// The updated-dependency list for the own unlock.
    pub fn with_own_unlock_result(mut self, dependencies: Vec<Dependency>) -> Self {
        self.own_result = Some(dependencies);
        self
    }

    /// Marks the current version vulnerable.
    pub fn vulnerable(mut self) -> Self {
        self.vulnerable = true;
        self
    }

    /// The lowest non-vulnerable candidate.
    pub fn with_lowest_fix(mut self, version: &str) -> Self {
        self.lowest_fix = Some(version.to_string());
        self
    }

    /// Dependencies pinning the resolution, for conflict reporting.
    pub fn with_conflicting(mut self, conflicting: Vec<ConflictingDependency>) -> Self {
        self.conflicting = conflicting;
        self
    }
}

/// Builds the updated form of a dependency for script results.
pub fn updated_dependency(name: &str, previous: &str, version: &str) -> Dependency {
    Dependency::new(
        name,
        Some(version.to_string()),
        vec![Requirement::new("deps.json", Some(format!("^{version}")))],
        "mock",
    )
    .with_previous(
        Some(previous.to_string()),
        vec![Requirement::new("deps.json", Some(format!("^{previous}")))],
    )
}

struct MockChecker {
    dependency: Dependency,
    script: Script,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockChecker {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn auto_bump(&self) -> Vec<Dependency> {
        let Some(latest) = &self.script.latest else {
            return Vec::new();
        };
        vec![updated_dependency(
            &self.dependency.name,
            self.dependency.version.as_deref().unwrap_or("0.0.0"),
            latest,
        )]
    }
}

#[async_trait]
impl UpdateChecker for MockChecker {
    fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    async fn latest_version(&self) -> Result<Option<Version>, UpdaterError> {
        self.record(format!("latest_version:{}", self.dependency.name));
        match &self.script.failure {
            Some(Failure::NotResolvable(message)) => {
                Err(UpdaterError::not_resolvable(message.clone()))
            }
            Some(Failure::RateLimited) => Err(UpdaterError::RateLimited { reset_at: Some(60) }),
            Some(Failure::AllVersionsIgnored) => {
                Err(UpdaterError::all_versions_ignored(&self.dependency.name))
            }
            None => Ok(self.script.latest.as_deref().and_then(Version::parse)),
        }
    }

    async fn up_to_date(&self) -> Result<bool, UpdaterError> {
        Ok(self.script.up_to_date)
    }

    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, UpdaterError> {
        self.record(format!("can_update:{}:{}", unlock, self.dependency.name));
        Ok(match unlock {
            RequirementsToUnlock::None => false,
            RequirementsToUnlock::Own => self.script.can_update_own,
            RequirementsToUnlock::All => self.script.can_update_all,
        })
    }

    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<Dependency>, UpdaterError> {
        self.record(format!(
            "updated_dependencies:{}:{}",
            unlock, self.dependency.name
        ));
        Ok(match unlock {
            RequirementsToUnlock::None => Vec::new(),
            RequirementsToUnlock::Own => self
                .script
                .own_result
                .clone()
                .unwrap_or_else(|| self.auto_bump()),
            RequirementsToUnlock::All => self
                .script
                .all_result
                .clone()
                .or_else(|| self.script.own_result.clone())
                .unwrap_or_else(|| self.auto_bump()),
        })
    }

    fn vulnerable(&self) -> bool {
        self.script.vulnerable
    }

    async fn lowest_security_fix_version(&self) -> Result<Option<Version>, UpdaterError> {
        Ok(self.script.lowest_fix.as_deref().and_then(Version::parse))
    }

    async fn conflicting_dependencies(
        &self,
    ) -> Result<Vec<ConflictingDependency>, UpdaterError> {
        Ok(self.script.conflicting.clone())
    }

    fn requirements_unlocked_or_can_be(&self) -> bool {
        true
    }
}

/// Ecosystem answering from scripts, with call recording.
pub struct MockEcosystem {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEcosystem {
    fn new(scripts: HashMap<String, Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct MockParser;

impl FileParser for MockParser {
    fn parse(&self, files: &[DependencyFile]) -> Result<Vec<Dependency>, UpdaterError> {
        let mut dependencies = Vec::new();
        for file in files.iter().filter(|f| f.name == "deps.json") {
            let parsed: Vec<Dependency> = serde_json::from_str(&file.content)
                .map_err(|e| UpdaterError::not_evaluatable(e.to_string()))?;
            dependencies.extend(parsed);
        }
        Ok(dependencies)
    }
}

struct MockUpdater;

impl FileUpdater for MockUpdater {
    fn updated_files(
        &self,
        files: &[DependencyFile],
        _dependencies: &[Dependency],
    ) -> Result<Vec<DependencyFile>, UpdaterError> {
        Ok(files
            .iter()
            .filter(|f| f.name == "deps.json" && !f.support_file)
            .cloned()
            .collect())
    }
}

impl Ecosystem for MockEcosystem {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn manifest_names(&self) -> &'static [&'static str] {
        &["deps.json"]
    }

    fn file_parser(&self) -> Box<dyn FileParser> {
        Box::new(MockParser)
    }

    fn update_checker(
        &self,
        dependency: Dependency,
        _files: Vec<DependencyFile>,
        _config: CheckerConfig,
    ) -> Box<dyn UpdateChecker> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&dependency.name)
            .cloned()
            .unwrap_or_else(|| Script::up_to_date("0.0.0"));
        Box::new(MockChecker {
            dependency,
            script,
            calls: Arc::clone(&self.calls),
        })
    }

    fn file_updater(&self) -> Box<dyn FileUpdater> {
        Box::new(MockUpdater)
    }
}

/// A configured job plus mock ecosystem, ready to snapshot.
pub struct Harness {
    pub job: Job,
    pub registry: EcosystemRegistry,
    pub files: Vec<DependencyFile>,
    ecosystem: Arc<MockEcosystem>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn snapshot(&self) -> DependencySnapshot {
        DependencySnapshot::create(&self.job, self.files.clone(), "mock-sha", &self.registry)
            .expect("mock snapshot parses")
    }

    /// Every checker call recorded so far.
    pub fn calls(&self) -> Vec<String> {
        self.ecosystem.calls.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct HarnessBuilder {
    dependencies: Vec<(String, Dependency)>,
    scripts: HashMap<String, Script>,
    allowed_updates: Vec<AllowedUpdate>,
    ignore_conditions: Vec<IgnoreCondition>,
    existing_pull_requests: Vec<Vec<PullRequestRef>>,
    existing_group_pull_requests: Vec<GroupPullRequest>,
    groups: Vec<GroupConfig>,
    directories: Vec<String>,
    security_updates_only: bool,
    target_dependencies: Vec<String>,
    updating_a_pull_request: bool,
    dependency_group_to_refresh: Option<String>,
    advisories: Vec<crate::job::AdvisoryConfig>,
    experiments: BTreeMap<String, serde_json::Value>,
}

impl HarnessBuilder {
    /// Adds a direct dependency in "/".
    pub fn dependency(self, name: &str, version: &str) -> Self {
        self.dependency_in("/", name, version)
    }

    /// Adds a direct dependency in a specific directory.
    pub fn dependency_in(mut self, directory: &str, name: &str, version: &str) -> Self {
        let dep = Dependency::new(
            name,
            Some(version.to_string()),
            vec![Requirement::new("deps.json", Some(format!("^{version}")))],
            "mock",
        )
        .in_directory(directory);
        self.dependencies.push((directory.to_string(), dep));
        self
    }

    /// Adds a lockfile-only sub-dependency (no requirements) in "/".
    pub fn subdependency(mut self, name: &str, version: &str) -> Self {
        let dep = Dependency::new(name, Some(version.to_string()), vec![], "mock");
        self.dependencies.push(("/".to_string(), dep));
        self
    }

    pub fn script(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn allow_only(mut self, name: &str) -> Self {
        self.allowed_updates.push(AllowedUpdate {
            dependency_name: Some(name.to_string()),
            dependency_type: None,
            update_type: None,
        });
        self
    }

    pub fn ignore_condition(mut self, name: &str, requirement: &str) -> Self {
        self.ignore_conditions.push(IgnoreCondition {
            dependency_name: name.to_string(),
            version_requirement: Some(requirement.to_string()),
            update_types: Vec::new(),
            source: None,
        });
        self
    }

    pub fn existing_pull_request(mut self, name: &str, version: &str) -> Self {
        self.existing_pull_requests.push(vec![PullRequestRef {
            dependency_name: name.to_string(),
            dependency_version: Some(version.to_string()),
            dependency_removed: false,
            directory: None,
        }]);
        self
    }

    pub fn existing_group_pull_request(
        mut self,
        group: &str,
        entries: Vec<(&str, &str)>,
    ) -> Self {
        self.existing_group_pull_requests.push(GroupPullRequest {
            dependency_group_name: group.to_string(),
            dependencies: entries
                .into_iter()
                .map(|(name, version)| PullRequestRef {
                    dependency_name: name.to_string(),
                    dependency_version: Some(version.to_string()),
                    dependency_removed: false,
                    directory: Some("/".to_string()),
                })
                .collect(),
        });
        self
    }

    pub fn group(mut self, name: &str, patterns: &[&str]) -> Self {
        self.groups.push(GroupConfig {
            name: name.to_string(),
            applies_to: None,
            rules: GroupRules {
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        });
        self
    }

    pub fn group_config(mut self, config: GroupConfig) -> Self {
        self.groups.push(config);
        self
    }

    pub fn directories(mut self, directories: &[&str]) -> Self {
        self.directories = directories.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn security_updates_only(mut self) -> Self {
        self.security_updates_only = true;
        self
    }

    pub fn target_dependency(mut self, name: &str) -> Self {
        self.target_dependencies.push(name.to_string());
        self
    }

    pub fn updating_a_pull_request(mut self) -> Self {
        self.updating_a_pull_request = true;
        self
    }

    pub fn group_to_refresh(mut self, name: &str) -> Self {
        self.dependency_group_to_refresh = Some(name.to_string());
        self
    }

    pub fn advisory(mut self, name: &str, affected: &str, patched: &str) -> Self {
        self.advisories.push(crate::job::AdvisoryConfig {
            dependency_name: name.to_string(),
            affected_versions: vec![affected.to_string()],
            patched_versions: vec![patched.to_string()],
            unaffected_versions: Vec::new(),
        });
        self
    }

    pub fn experiment(mut self, name: &str) -> Self {
        self.experiments
            .insert(name.to_string(), serde_json::Value::Bool(true));
        self
    }

    pub fn build(self) -> Harness {
        let directories = if self.directories.is_empty() {
            vec!["/".to_string()]
        } else {
            self.directories.clone()
        };

        let mut files = Vec::new();
        for directory in &directories {
            let deps: Vec<&Dependency> = self
                .dependencies
                .iter()
                .filter(|(dir, _)| dir == directory)
                .map(|(_, dep)| dep)
                .collect();
            let content = serde_json::to_string(&deps).expect("dependencies serialize");
            files.push(DependencyFile::new("deps.json", content).in_directory(directory.clone()));
        }

        let allowed_updates = if self.allowed_updates.is_empty() {
            vec![AllowedUpdate {
                dependency_name: None,
                dependency_type: None,
                update_type: None,
            }]
        } else {
            self.allowed_updates
        };

        let config = JobConfig {
            package_manager: "mock".to_string(),
            source: SourceConfig {
                provider: "github".to_string(),
                repo: "org/repo".to_string(),
                directory: None,
                directories: Some(directories),
                branch: None,
                commit: None,
            },
            allowed_updates,
            security_advisories: self.advisories,
            ignore_conditions: self.ignore_conditions,
            dependency_groups: self.groups,
            existing_pull_requests: self.existing_pull_requests,
            existing_group_pull_requests: self.existing_group_pull_requests,
            security_updates_only: self.security_updates_only,
            lockfile_only: false,
            updating_a_pull_request: self.updating_a_pull_request,
            dependencies: self.target_dependencies,
            dependency_group_to_refresh: self.dependency_group_to_refresh,
            experiments: self.experiments,
            cooldown: None,
            credentials_metadata: Vec::new(),
        };
        let job = Job::from_definition(JobDefinition { job: config });

        let ecosystem = Arc::new(MockEcosystem::new(self.scripts));
        let mut registry = EcosystemRegistry::new();
        registry.register(Arc::clone(&ecosystem) as Arc<dyn Ecosystem>);

        Harness {
            job,
            registry,
            files,
            ecosystem,
        }
    }
}
