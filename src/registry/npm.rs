//! npm registry version source
//!
//! Fetches package version information from the npm registry.
//! API endpoint: https://registry.npmjs.org/{package}

use super::{HttpClient, VersionInfo, VersionSource};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// npm registry base URL
const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// npm registry adapter.
pub struct NpmSource {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    /// Publish time per version
    #[serde(default)]
    time: HashMap<String, String>,
    /// Published versions, values unused
    versions: HashMap<String, serde_json::Value>,
}

impl NpmSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn build_url(&self, package: &str) -> String {
        format!("{NPM_REGISTRY_URL}/{package}")
    }
}

#[async_trait]
impl VersionSource for NpmSource {
    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let response: NpmPackageResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        let mut versions = Vec::new();
        for version in response.versions.into_keys() {
            let released_at = response
                .time
                .get(&version)
                .and_then(|t| t.parse::<DateTime<Utc>>().ok());
            versions.push(VersionInfo::new(version, released_at));
        }
        Ok(versions)
    }
}
