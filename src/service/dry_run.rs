//! Recording service for dry runs and tests
//!
//! Stands in for the backend when no API endpoint is configured: every
//! action is logged and recorded in memory so the CLI can summarize
//! what a real run would have done.

use super::{CloseReason, Service};
use crate::domain::DependencyChange;
use crate::error::ApiError;
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::sync::Mutex;

/// One recorded service interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    CreatedPullRequest {
        dependencies: Vec<String>,
        group: Option<String>,
    },
    UpdatedPullRequest {
        dependencies: Vec<String>,
    },
    ClosedPullRequest {
        dependencies: Vec<String>,
        reason: &'static str,
    },
    RecordedError {
        error_type: String,
        details: Value,
    },
    RecordedUnknownError {
        details: Value,
    },
    MarkedProcessed {
        base_commit_sha: String,
    },
}

/// In-memory service double.
#[derive(Debug, Default)]
pub struct DryRunService {
    events: Mutex<Vec<ServiceEvent>>,
}

impl DryRunService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded error types, in order.
    pub fn error_types(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServiceEvent::RecordedError { error_type, .. } => Some(error_type),
                _ => None,
            })
            .collect()
    }

    /// Dependency-name lists of created pull requests, in order.
    pub fn created_pull_requests(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServiceEvent::CreatedPullRequest { dependencies, .. } => Some(dependencies),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ServiceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Service for DryRunService {
    async fn create_pull_request(
        &self,
        change: &DependencyChange,
        _base_commit_sha: &str,
    ) -> Result<(), ApiError> {
        let dependencies = change.dependency_names();
        info!(
            "Would create pull request for {}",
            dependencies.join(", ")
        );
        self.record(ServiceEvent::CreatedPullRequest {
            dependencies,
            group: change.group_name.clone(),
        });
        Ok(())
    }

    async fn update_pull_request(
        &self,
        change: &DependencyChange,
        _base_commit_sha: &str,
    ) -> Result<(), ApiError> {
        let dependencies = change.dependency_names();
        info!("Would update pull request for {}", dependencies.join(", "));
        self.record(ServiceEvent::UpdatedPullRequest { dependencies });
        Ok(())
    }

    async fn close_pull_request(
        &self,
        dependency_names: &[String],
        reason: CloseReason,
    ) -> Result<(), ApiError> {
        info!(
            "Would close pull request for {} - {}",
            dependency_names.join(", "),
            reason.humanized()
        );
        self.record(ServiceEvent::ClosedPullRequest {
            dependencies: dependency_names.to_vec(),
            reason: reason.as_str(),
        });
        Ok(())
    }

    async fn record_update_job_error(
        &self,
        error_type: &str,
        details: Value,
    ) -> Result<(), ApiError> {
        self.record(ServiceEvent::RecordedError {
            error_type: error_type.to_string(),
            details,
        });
        Ok(())
    }

    async fn record_update_job_unknown_error(&self, details: Value) -> Result<(), ApiError> {
        self.record(ServiceEvent::RecordedUnknownError { details });
        Ok(())
    }

    async fn mark_job_as_processed(&self, base_commit_sha: &str) -> Result<(), ApiError> {
        self.record(ServiceEvent::MarkedProcessed {
            base_commit_sha: base_commit_sha.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Dependency;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_are_recorded_in_order() {
        let service = DryRunService::new();
        let change = DependencyChange::new(
            vec![Dependency::new("serde", Some("1.0.0".into()), vec![], "cargo")],
            vec![],
        );

        service.create_pull_request(&change, "sha").await.unwrap();
        service
            .record_update_job_error("all_versions_ignored", json!({"dependency-name": "x"}))
            .await
            .unwrap();
        service.mark_job_as_processed("sha").await.unwrap();

        let events = service.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ServiceEvent::CreatedPullRequest { .. }));
        assert_eq!(service.error_types(), vec!["all_versions_ignored"]);
        assert_eq!(service.created_pull_requests(), vec![vec!["serde".to_string()]]);
    }
}
