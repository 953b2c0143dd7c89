//! crates.io version source
//!
//! Fetches crate version information from crates.io.
//! API endpoint: https://crates.io/api/v1/crates/{crate}
//!
//! Note: crates.io requires a User-Agent header (handled by HttpClient)
//! and asks for at most 1 request per second.

use super::{HttpClient, VersionInfo, VersionSource};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// crates.io API base URL
const CRATES_IO_API_URL: &str = "https://crates.io/api/v1/crates";

/// Minimum interval between requests
const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

/// crates.io adapter with client-side rate limiting.
pub struct CratesIoSource {
    client: HttpClient,
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct CratesIoResponse {
    versions: Vec<CrateVersion>,
}

#[derive(Debug, Deserialize)]
struct CrateVersion {
    num: String,
    created_at: String,
    yanked: bool,
}

impl CratesIoSource {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            last_request: Mutex::new(None),
        }
    }

    async fn apply_rate_limit(&self) {
        let elapsed = self.last_request.lock().unwrap().map(|t| t.elapsed());
        if let Some(elapsed) = elapsed {
            if elapsed < RATE_LIMIT_INTERVAL {
                tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
            }
        }
        *self.last_request.lock().unwrap() = Some(Instant::now());
    }
}

#[async_trait]
impl VersionSource for CratesIoSource {
    fn registry_name(&self) -> &'static str {
        "crates.io"
    }

    async fn versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        self.apply_rate_limit().await;

        let url = format!("{CRATES_IO_API_URL}/{package}");
        let response: CratesIoResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        let mut versions = Vec::new();
        for version in response.versions {
            if version.yanked {
                continue;
            }
            let released_at = version.created_at.parse::<DateTime<Utc>>().ok();
            versions.push(VersionInfo::new(version.num, released_at));
        }
        Ok(versions)
    }
}
