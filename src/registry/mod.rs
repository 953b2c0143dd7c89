//! Registry version sources
//!
//! A `VersionSource` answers one question for the update checkers:
//! which versions of a package exist, and when were they released.
//! This module provides:
//! - the shared HTTP client with retry logic
//! - the crates.io and npm registry adapters
//! - an in-memory source for offline use and tests

mod client;
mod crates_io;
mod npm;

pub use client::HttpClient;
pub use crates_io::CratesIoSource;
pub use npm::NpmSource;

use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// The version string as published
    pub version: String,
    /// Release timestamp, when the registry reports one
    pub released_at: Option<DateTime<Utc>>,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, released_at: Option<DateTime<Utc>>) -> Self {
        Self {
            version: version.into(),
            released_at,
        }
    }
}

/// Fetches published versions for packages of one registry.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// The registry name, used in error context and logs.
    fn registry_name(&self) -> &'static str;

    /// All published, non-yanked versions of a package.
    async fn versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError>;
}

/// An in-memory version source. The CLI uses it when running offline;
/// tests use it to script candidate versions.
#[derive(Debug, Default)]
pub struct StaticVersionSource {
    versions: Mutex<BTreeMap<String, Vec<VersionInfo>>>,
}

impl StaticVersionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the known versions of a package.
    pub fn insert(&self, package: impl Into<String>, versions: Vec<VersionInfo>) {
        self.versions.lock().unwrap().insert(package.into(), versions);
    }
}

#[async_trait]
impl VersionSource for StaticVersionSource {
    fn registry_name(&self) -> &'static str {
        "static"
    }

    async fn versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        self.versions
            .lock()
            .unwrap()
            .get(package)
            .cloned()
            .ok_or_else(|| RegistryError::PackageNotFound {
                package: package.to_string(),
                registry: "static".to_string(),
            })
    }
}
