//! Error classification and propagation
//!
//! Maps every `UpdaterError` to a wire error type and a propagation
//! policy. The policy decides whether a run dies loudly, records the
//! error and continues, or stays silent:
//! - Halt: the run stops, the error is reported, the job is still
//!   marked processed
//! - Report: recorded against the dependency, the loop continues
//! - Silent: logged locally, never reaches the backend
//! - Unknown: recorded as `unknown_error`, forwarded to the capture
//!   channel only when the tracking flag is on

use crate::domain::Dependency;
use crate::error::{ApiError, UpdaterError};
use crate::job::FeatureFlags;
use crate::service::Service;
use log::{error, info, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// What happens to the run after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Halt,
    Report,
    Silent,
    Unknown,
}

/// One classified error.
#[derive(Debug)]
pub struct Classification {
    pub error_type: &'static str,
    pub details: Value,
    pub disposition: Disposition,
}

/// Classifies an error into its wire type and disposition.
pub fn classify(error: &UpdaterError) -> Classification {
    match error {
        UpdaterError::RepoNotFound { repo } => Classification {
            error_type: "job_repo_not_found",
            details: json!({ "message": format!("repository not found: {repo}") }),
            disposition: Disposition::Halt,
        },
        UpdaterError::BranchNotFound { branch } => Classification {
            error_type: "branch_not_found",
            details: json!({ "branch-name": branch }),
            disposition: Disposition::Halt,
        },
        UpdaterError::UnsupportedPackageManager { name } => Classification {
            error_type: "tool_version_not_supported",
            details: json!({ "message": format!("unsupported package manager: {name}") }),
            disposition: Disposition::Halt,
        },
        UpdaterError::ToolVersionNotSupported {
            tool,
            detected,
            supported,
        } => Classification {
            error_type: "tool_version_not_supported",
            details: json!({
                "tool-name": tool,
                "detected-version": detected,
                "supported-versions": supported,
            }),
            disposition: Disposition::Halt,
        },
        UpdaterError::OutOfDisk => Classification {
            error_type: "out_of_disk",
            details: json!({}),
            disposition: Disposition::Halt,
        },
        UpdaterError::RateLimited { reset_at } => Classification {
            error_type: "rate_limited",
            details: json!({ "rate-limit-reset": reset_at }),
            disposition: Disposition::Halt,
        },
        UpdaterError::Unauthenticated { source_name } => Classification {
            error_type: "unauthenticated",
            details: json!({ "source": source_name }),
            disposition: Disposition::Halt,
        },
        UpdaterError::FileNotResolvable { message } => Classification {
            error_type: "dependency_file_not_resolvable",
            details: json!({ "message": message }),
            disposition: Disposition::Report,
        },
        UpdaterError::FileNotEvaluatable { message } => Classification {
            error_type: "dependency_file_not_evaluatable",
            details: json!({ "message": message }),
            disposition: Disposition::Report,
        },
        UpdaterError::GitDependenciesNotReachable { dependency_urls } => Classification {
            error_type: "git_dependencies_not_reachable",
            details: json!({ "dependency-urls": dependency_urls }),
            disposition: Disposition::Report,
        },
        UpdaterError::GitDependencyReferenceNotFound { dependency } => Classification {
            error_type: "git_dependency_reference_not_found",
            details: json!({ "dependency": dependency }),
            disposition: Disposition::Report,
        },
        UpdaterError::PrivateSourceAuthFailure { source_name } => Classification {
            error_type: "private_source_authentication_failure",
            details: json!({ "source": source_name }),
            disposition: Disposition::Report,
        },
        UpdaterError::ModulePathMismatch {
            file,
            declared,
            discovered,
        } => Classification {
            error_type: "go_module_path_mismatch",
            details: json!({
                "declared-path": declared,
                "discovered-path": discovered,
                "file-path": file,
            }),
            disposition: Disposition::Report,
        },
        UpdaterError::AllVersionsIgnored { dependency } => Classification {
            error_type: "all_versions_ignored",
            details: json!({ "dependency-name": dependency }),
            disposition: Disposition::Silent,
        },
        UpdaterError::InconsistentRegistryResponse { message } => Classification {
            error_type: "inconsistent_registry_response",
            details: json!({ "message": message }),
            disposition: Disposition::Silent,
        },
        UpdaterError::Unknown(_) => Classification {
            error_type: "unknown_error",
            details: json!({}),
            disposition: Disposition::Unknown,
        },
    }
}

/// Central error sink shared by every operation.
pub struct ErrorHandler<'a> {
    service: &'a dyn Service,
    flags: FeatureFlags,
    counts: Mutex<BTreeMap<String, usize>>,
}

impl<'a> ErrorHandler<'a> {
    pub fn new(service: &'a dyn Service, flags: FeatureFlags) -> Self {
        Self {
            service,
            flags,
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Per-error-type counts of everything reported this run.
    pub fn error_counts(&self) -> BTreeMap<String, usize> {
        self.counts.lock().unwrap().clone()
    }

    /// Records an operation-level error (the security-mode outcomes)
    /// against the backend and the run counts.
    pub async fn record(&self, error_type: &str, details: Value) {
        self.count(error_type);
        if let Err(e) = self.service.record_update_job_error(error_type, details).await {
            log_transport_failure(&e);
        }
    }

    /// Handles an error raised while processing one dependency.
    /// Run-halting errors come back as Err so the caller stops the
    /// loop; everything else is absorbed here and the loop continues.
    pub async fn handle_dependency_error(
        &self,
        error: UpdaterError,
        dependency: &Dependency,
    ) -> Result<(), UpdaterError> {
        let classification = classify(&error);
        match classification.disposition {
            Disposition::Halt => return Err(error),
            Disposition::Silent => {
                info!(
                    "Ignoring error whilst updating {}: {} {}",
                    dependency.name, classification.error_type, classification.details
                );
            }
            Disposition::Report => {
                let mut details = classification.details;
                if let Some(object) = details.as_object_mut() {
                    object.insert("dependency-name".into(), json!(dependency.name));
                }
                info!(
                    "Handled error whilst updating {}: {} {}",
                    dependency.name, classification.error_type, details
                );
                self.record(classification.error_type, details).await;
            }
            Disposition::Unknown => {
                error!("Error processing {} ({})", dependency.name, error);
                self.record(
                    "unknown_error",
                    json!({ "dependency-name": dependency.name }),
                )
                .await;
                if self.flags.record_unknown_errors {
                    let details = json!({
                        "error-class": "UpdaterError::Unknown",
                        "error-message": error.to_string(),
                        "dependency-name": dependency.name,
                    });
                    if let Err(e) = self.service.record_update_job_unknown_error(details).await {
                        log_transport_failure(&e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Handles a parse-time error. These are fatal for the whole run:
    /// the error is reported, then handed back for the caller to abort
    /// with (after marking the job processed).
    pub async fn handle_parse_error(&self, error: UpdaterError) -> UpdaterError {
        let classification = classify(&error);
        error!(
            "Parse failure: {} {}",
            classification.error_type, classification.details
        );
        self.record(classification.error_type, classification.details)
            .await;
        error
    }

    fn count(&self, error_type: &str) {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(error_type.to_string())
            .or_insert(0) += 1;
    }
}

/// Transport failures are caught and logged, never propagated as
/// control flow.
pub fn log_transport_failure(error: &ApiError) {
    warn!("Service call failed: {error}");
}
