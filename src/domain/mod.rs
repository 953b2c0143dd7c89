//! Core domain models for depbot
//!
//! This module contains the fundamental types used throughout the
//! engine:
//! - Version ordering and update-type classification
//! - Requirement-range parsing and matching
//! - Dependency and requirement structures
//! - Security advisory matching
//! - Dependency changes and pull-request references

mod advisory;
mod change;
mod dependency;
mod requirement;
mod version;

pub use advisory::SecurityAdvisory;
pub use change::{
    same_pull_request, same_pull_request_in_directory, DependencyChange, DependencyFile,
    FileOperation, PullRequestRef,
};
pub use dependency::{Dependency, Requirement, RequirementSource};
pub use requirement::{Constraint, VersionRange};
pub use version::{UpdateType, Version};
