//! Ecosystem metadata accumulation
//!
//! Instrumentation callbacks may fire from background reporting, so
//! this is the one component built for concurrent writers: all state
//! sits behind a lock and accumulation is safe from any thread.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Thread-safe accumulator for ecosystem name/version metadata.
#[derive(Debug, Default)]
pub struct EcosystemTelemetry {
    versions: Mutex<BTreeMap<String, String>>,
    counters: Mutex<BTreeMap<String, u64>>,
}

impl EcosystemTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the version of a tool seen during the run; the last
    /// write for a name wins.
    pub fn record_version(&self, name: impl Into<String>, version: impl Into<String>) {
        self.versions
            .lock()
            .unwrap()
            .insert(name.into(), version.into());
    }

    /// Increments a named counter.
    pub fn increment(&self, name: impl Into<String>) {
        *self.counters.lock().unwrap().entry(name.into()).or_insert(0) += 1;
    }

    /// A snapshot of everything accumulated, for the processed payload.
    pub fn snapshot(&self) -> Value {
        json!({
            "versions": self.versions.lock().unwrap().clone(),
            "counters": self.counters.lock().unwrap().clone(),
        })
    }
}
