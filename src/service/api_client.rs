//! Backend API client
//!
//! Thin reqwest client for the update-job API. Endpoints follow the
//! `update_jobs/{id}/<action>` shape; bodies are `{"data": <payload>}`
//! with kebab-case keys.

use super::{change_payload, CloseReason, Service};
use crate::domain::DependencyChange;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Request timeout for service calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the backend service.
pub struct ApiClient {
    client: Client,
    base_url: String,
    job_id: String,
    job_token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        job_id: impl Into<String>,
        job_token: Option<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("depbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            job_id: job_id.into(),
            job_token,
        })
    }

    fn endpoint_url(&self, action: &str) -> String {
        format!("{}/update_jobs/{}/{}", self.base_url, self.job_id, action)
    }

    async fn post(&self, action: &str, body: Value) -> Result<(), ApiError> {
        let url = self.endpoint_url(action);
        let mut request = self.client.post(&url).json(&json!({ "data": body }));
        if let Some(token) = &self.job_token {
            request = request.header("Authorization", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: response.status().as_u16(),
                endpoint: action.to_string(),
            })
        }
    }

    async fn patch(&self, action: &str, body: Value) -> Result<(), ApiError> {
        let url = self.endpoint_url(action);
        let mut request = self.client.patch(&url).json(&json!({ "data": body }));
        if let Some(token) = &self.job_token {
            request = request.header("Authorization", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: response.status().as_u16(),
                endpoint: action.to_string(),
            })
        }
    }
}

#[async_trait]
impl Service for ApiClient {
    async fn create_pull_request(
        &self,
        change: &DependencyChange,
        base_commit_sha: &str,
    ) -> Result<(), ApiError> {
        self.post("create_pull_request", change_payload(change, base_commit_sha))
            .await
    }

    async fn update_pull_request(
        &self,
        change: &DependencyChange,
        base_commit_sha: &str,
    ) -> Result<(), ApiError> {
        self.post("update_pull_request", change_payload(change, base_commit_sha))
            .await
    }

    async fn close_pull_request(
        &self,
        dependency_names: &[String],
        reason: CloseReason,
    ) -> Result<(), ApiError> {
        self.post(
            "close_pull_request",
            json!({
                "dependency-names": dependency_names,
                "reason": reason.as_str(),
            }),
        )
        .await
    }

    async fn record_update_job_error(
        &self,
        error_type: &str,
        details: Value,
    ) -> Result<(), ApiError> {
        self.post(
            "record_update_job_error",
            json!({
                "error-type": error_type,
                "error-details": details,
            }),
        )
        .await
    }

    async fn record_update_job_unknown_error(&self, details: Value) -> Result<(), ApiError> {
        self.post(
            "record_update_job_unknown_error",
            json!({
                "error-type": "unknown_error",
                "error-details": details,
            }),
        )
        .await
    }

    async fn mark_job_as_processed(&self, base_commit_sha: &str) -> Result<(), ApiError> {
        self.patch(
            "mark_as_processed",
            json!({ "base-commit-sha": base_commit_sha }),
        )
        .await
    }
}
