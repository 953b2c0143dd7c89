//! Error types for the update engine
//!
//! Error hierarchy:
//! - UpdaterError: the classified errors the decision loop produces;
//!   the error handler maps each variant to a wire error type and a
//!   propagation policy (halt the run, report and continue, or stay
//!   silent)
//! - RegistryError: version-source communication failures
//! - ApiError: backend service transport failures

use thiserror::Error;

/// Errors raised while deciding and applying dependency updates.
///
/// The variant determines how the error handler treats it; see
/// `updater::error_handler` for the taxonomy.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The repository backing the job no longer exists
    #[error("repository not found: {repo}")]
    RepoNotFound { repo: String },

    /// The job's target branch does not exist
    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// No ecosystem is registered under the job's package manager name
    #[error("unsupported package manager: {name}")]
    UnsupportedPackageManager { name: String },

    /// The project requires a tool version the updater cannot provide
    #[error("unsupported {tool} version {detected}, supported: {supported}")]
    ToolVersionNotSupported {
        tool: String,
        detected: String,
        supported: String,
    },

    /// The updater ran out of disk space
    #[error("out of disk space")]
    OutOfDisk,

    /// An upstream rate limit was hit; the caller retries after reset
    #[error("rate limited, reset at epoch {reset_at:?}")]
    RateLimited { reset_at: Option<u64> },

    /// The job's credentials were rejected by the source
    #[error("authentication failed for {source_name}")]
    Unauthenticated { source_name: String },

    /// The dependency files cannot be resolved to a consistent set
    #[error("dependency files not resolvable: {message}")]
    FileNotResolvable { message: String },

    /// A dependency file is malformed beyond evaluation
    #[error("dependency file not evaluatable: {message}")]
    FileNotEvaluatable { message: String },

    /// Git dependencies could not be reached
    #[error("git dependencies not reachable: {}", dependency_urls.join(", "))]
    GitDependenciesNotReachable { dependency_urls: Vec<String> },

    /// A git dependency's pinned reference no longer exists
    #[error("git reference not found for {dependency}")]
    GitDependencyReferenceNotFound { dependency: String },

    /// A private package source rejected the job's credentials
    #[error("private source authentication failure: {source_name}")]
    PrivateSourceAuthFailure { source_name: String },

    /// A module's declared path does not match its discovered path
    #[error("module path mismatch in {file}: declared {declared}, discovered {discovered}")]
    ModulePathMismatch {
        file: String,
        declared: String,
        discovered: String,
    },

    /// Every candidate version was excluded by ignore conditions
    #[error("all versions of {dependency} were ignored")]
    AllVersionsIgnored { dependency: String },

    /// A registry returned mutually inconsistent data; retrying the
    /// job usually resolves it
    #[error("inconsistent registry response: {message}")]
    InconsistentRegistryResponse { message: String },

    /// Anything not classified above
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl UpdaterError {
    /// Creates a FileNotEvaluatable error
    pub fn not_evaluatable(message: impl Into<String>) -> Self {
        UpdaterError::FileNotEvaluatable {
            message: message.into(),
        }
    }

    /// Creates a FileNotResolvable error
    pub fn not_resolvable(message: impl Into<String>) -> Self {
        UpdaterError::FileNotResolvable {
            message: message.into(),
        }
    }

    /// Creates an AllVersionsIgnored error
    pub fn all_versions_ignored(dependency: impl Into<String>) -> Self {
        UpdaterError::AllVersionsIgnored {
            dependency: dependency.into(),
        }
    }

    /// Creates an InconsistentRegistryResponse error
    pub fn inconsistent_registry(message: impl Into<String>) -> Self {
        UpdaterError::InconsistentRegistryResponse {
            message: message.into(),
        }
    }

    /// Creates an Unknown error from a plain message
    pub fn unknown(message: impl Into<String>) -> Self {
        UpdaterError::Unknown(anyhow::anyhow!(message.into()))
    }
}

/// Errors from registry version sources.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in the registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Response did not match the expected shape
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },
}

impl RegistryError {
    /// Creates a NetworkError
    pub fn network(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }
}

impl From<RegistryError> for UpdaterError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::RateLimitExceeded { .. } => {
                UpdaterError::RateLimited { reset_at: None }
            }
            RegistryError::InvalidResponse {
                package,
                registry,
                message,
            } => UpdaterError::inconsistent_registry(format!(
                "{registry} returned bad data for {package}: {message}"
            )),
            other => UpdaterError::Unknown(anyhow::Error::new(other)),
        }
    }
}

/// Errors from the backend service transport.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request could not be sent or timed out
    #[error("service request failed: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("service returned {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
}
