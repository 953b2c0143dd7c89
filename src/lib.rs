//! depbot - dependency update pull-request decision engine
//!
//! Given a job definition (rules, advisories, groups, existing PR
//! state) and a repository checkout, depbot decides which dependencies
//! are eligible to update, groups them, computes the file changes, and
//! tells the backend service to open, update or close pull requests.
//! One bad dependency never aborts a run; every run ends by marking the
//! job processed exactly once.

pub mod cli;
pub mod domain;
pub mod ecosystem;
pub mod error;
pub mod fetcher;
pub mod group;
pub mod job;
pub mod output;
pub mod progress;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod telemetry;
pub mod updater;
pub mod wildcard;
