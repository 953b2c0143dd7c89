//! Backend service boundary
//!
//! Every pull-request action and error report flows through the
//! `Service` trait. The decision loop treats these calls as
//! fire-and-forget: transport failures are logged and classified, never
//! propagated as control flow. Payload dictionaries use kebab-case keys
//! at the wire boundary regardless of internal naming.

mod api_client;
mod dry_run;

pub use api_client::ApiClient;
pub use dry_run::{DryRunService, ServiceEvent};

use crate::domain::{Dependency, DependencyChange};
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Why a pull request is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    UpToDate,
    DependencyRemoved,
    DependenciesChanged,
    UpdateNoLongerPossible,
}

impl CloseReason {
    /// The wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::UpToDate => "up_to_date",
            CloseReason::DependencyRemoved => "dependency_removed",
            CloseReason::DependenciesChanged => "dependencies_changed",
            CloseReason::UpdateNoLongerPossible => "update_no_longer_possible",
        }
    }

    /// The human form used in log lines.
    pub fn humanized(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// The backend API surface the updater drives.
#[async_trait]
pub trait Service: Send + Sync {
    async fn create_pull_request(
        &self,
        change: &DependencyChange,
        base_commit_sha: &str,
    ) -> Result<(), ApiError>;

    async fn update_pull_request(
        &self,
        change: &DependencyChange,
        base_commit_sha: &str,
    ) -> Result<(), ApiError>;

    async fn close_pull_request(
        &self,
        dependency_names: &[String],
        reason: CloseReason,
    ) -> Result<(), ApiError>;

    async fn record_update_job_error(
        &self,
        error_type: &str,
        details: Value,
    ) -> Result<(), ApiError>;

    /// The unknown-error capture channel, only used when the tracking
    /// flag is enabled.
    async fn record_update_job_unknown_error(&self, details: Value) -> Result<(), ApiError>;

    /// Must be called exactly once per run, regardless of outcome.
    async fn mark_job_as_processed(&self, base_commit_sha: &str) -> Result<(), ApiError>;
}

/// Serializes a dependency into its wire dictionary.
pub fn dependency_payload(dependency: &Dependency) -> Value {
    let requirements: Vec<Value> = dependency
        .requirements
        .iter()
        .map(|req| {
            json!({
                "file": req.file,
                "requirement": req.requirement,
                "groups": req.groups,
                "source": req.source,
            })
        })
        .collect();

    let mut payload = json!({
        "dependency-name": dependency.name,
        "directory": dependency.directory,
        "requirements": requirements,
    });
    let object = payload.as_object_mut().expect("payload is an object");
    if dependency.removed {
        object.insert("dependency-removed".into(), json!(true));
    } else {
        object.insert("dependency-version".into(), json!(dependency.version));
    }
    if let Some(previous) = &dependency.previous_version {
        object.insert("previous-version".into(), json!(previous));
    }
    payload
}

/// Serializes a change into the create/update PR payload body.
pub fn change_payload(change: &DependencyChange, base_commit_sha: &str) -> Value {
    let files: Vec<Value> = change
        .updated_files
        .iter()
        .map(|file| {
            json!({
                "name": file.name,
                "directory": file.directory,
                "content": file.content,
                "operation": file.operation,
            })
        })
        .collect();

    let mut payload = json!({
        "base-commit-sha": base_commit_sha,
        "dependencies": change
            .updated_dependencies
            .iter()
            .map(dependency_payload)
            .collect::<Vec<Value>>(),
        "updated-dependency-files": files,
    });
    if let Some(group) = &change.group_name {
        payload
            .as_object_mut()
            .expect("payload is an object")
            .insert("dependency-group".into(), json!(group));
    }
    payload
}
