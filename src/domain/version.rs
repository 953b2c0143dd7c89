//! Ecosystem-agnostic version ordering
//!
//! Every decision that asks "is X newer than Y" goes through this type.
//! It accepts the loose version shapes real registries produce (two or
//! four release segments, `v` prefixes, prerelease and build-metadata
//! suffixes) and orders them with semver-like rules:
//! - release segments compare numerically, missing segments count as 0
//! - a release version sorts above the same version with a prerelease
//! - prerelease identifiers compare dot-segment by dot-segment, numeric
//!   segments numerically, alphanumeric segments lexically, and numeric
//!   segments sort below alphanumeric ones
//! - build metadata only breaks ties between otherwise equal versions

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A parsed version string. Equality follows the ordering, so "1.0"
/// and "1.0.0" compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Numeric release segments (e.g., `[1, 2, 3]` for "1.2.3")
    release: Vec<u64>,
    /// Prerelease identifiers (e.g., `["preview", "8"]`), empty for releases
    prerelease: Vec<String>,
    /// Build metadata after `+`, if any
    build: Option<String>,
    /// The original string as parsed
    raw: String,
}

/// Kind of version jump between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateType {
    SemverMajor,
    SemverMinor,
    SemverPatch,
}

impl UpdateType {
    /// The identifier used in job configuration (`semver-major` etc.)
    pub fn as_config_str(&self) -> &'static str {
        match self {
            UpdateType::SemverMajor => "semver-major",
            UpdateType::SemverMinor => "semver-minor",
            UpdateType::SemverPatch => "semver-patch",
        }
    }

    /// The short form used in group `update-types` rules.
    pub fn as_group_rule_str(&self) -> &'static str {
        match self {
            UpdateType::SemverMajor => "major",
            UpdateType::SemverMinor => "minor",
            UpdateType::SemverPatch => "patch",
        }
    }
}

impl Version {
    /// Parses a version string, returning None when the string has no
    /// leading numeric segment. Callers are expected to skip the
    /// dependency and log a warning rather than fail the run.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        let stripped = raw.strip_prefix('v').or_else(|| raw.strip_prefix('V')).unwrap_or(raw);

        let (core, build) = match stripped.split_once('+') {
            Some((c, b)) => (c, Some(b.to_string())),
            None => (stripped, None),
        };
        let (release_part, pre_part) = match core.split_once('-') {
            Some((r, p)) => (r, Some(p)),
            None => (core, None),
        };

        let mut release = Vec::new();
        for segment in release_part.split('.') {
            match segment.parse::<u64>() {
                Ok(n) => release.push(n),
                Err(_) => return None,
            }
        }
        if release.is_empty() {
            return None;
        }

        let prerelease = match pre_part {
            Some(p) if !p.is_empty() => p.split('.').map(str::to_string).collect(),
            Some(_) => return None,
            None => Vec::new(),
        };

        Some(Self {
            release,
            prerelease,
            build,
            raw: raw.to_string(),
        })
    }

    /// Major segment (0 if absent).
    pub fn major(&self) -> u64 {
        self.release.first().copied().unwrap_or(0)
    }

    /// Minor segment (0 if absent).
    pub fn minor(&self) -> u64 {
        self.release.get(1).copied().unwrap_or(0)
    }

    /// Patch segment (0 if absent).
    pub fn patch(&self) -> u64 {
        self.release.get(2).copied().unwrap_or(0)
    }

    /// Returns true if this version carries prerelease identifiers.
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// The original string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Classifies the jump from `previous` to `self`.
    pub fn update_type_from(&self, previous: &Version) -> UpdateType {
        if self.major() != previous.major() {
            UpdateType::SemverMajor
        } else if self.minor() != previous.minor() {
            UpdateType::SemverMinor
        } else {
            UpdateType::SemverPatch
        }
    }
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let sa = a.get(i).copied().unwrap_or(0);
        let sb = b.get(i).copied().unwrap_or(0);
        match sa.cmp(&sb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn compare_prerelease(a: &[String], b: &[String]) -> Ordering {
    // A release (no prerelease) sorts above any prerelease of the same
    // release segments.
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    for (sa, sb) in a.iter().zip(b.iter()) {
        let ord = match (sa.parse::<u64>(), sb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            // Numeric identifiers sort below alphanumeric ones
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => sa.cmp(sb),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    // Equal prefixes: more identifiers sort higher
    a.len().cmp(&b.len())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_release(&self.release, &other.release)
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let version = v("1.2.3");
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 2);
        assert_eq!(version.patch(), 3);
        assert!(!version.is_prerelease());
    }

    #[test]
    fn test_parse_v_prefix() {
        assert_eq!(v("v1.2.3"), v("1.2.3"));
    }

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
        let four = v("4.8.0.1");
        assert_eq!(four.major(), 4);
        assert!(four > v("4.8.0"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("").is_none());
        assert!(Version::parse("not-a-version").is_none());
        assert!(Version::parse("1.x.3").is_none());
        assert!(Version::parse("1.0-").is_none());
    }

    #[test]
    fn test_release_ordering() {
        assert!(v("1.9.0") < v("1.10.0"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert_eq!(v("1.0.0").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_release_sorts_above_prerelease() {
        assert!(v("1.0.0") > v("1.0.0-alpha"));
        assert!(v("1.0.0-alpha") < v("1.0.0"));
    }

    #[test]
    fn test_numeric_prerelease_segments_compare_numerically() {
        assert!(v("1.3.1-preview.8") < v("1.3.1-preview.24"));
        assert!(v("1.0.0-rc.2") < v("1.0.0-rc.10"));
    }

    #[test]
    fn test_numeric_sorts_below_alphanumeric() {
        assert!(v("1.0.0-1") < v("1.0.0-alpha"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
    }

    #[test]
    fn test_longer_prerelease_wins_on_equal_prefix() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
    }

    #[test]
    fn test_build_metadata_is_a_tiebreak_only() {
        assert!(v("1.0.0+build.2") > v("1.0.0+build.1"));
        assert!(v("1.0.0+anything") > v("1.0.0"));
        assert!(v("1.0.1") > v("1.0.0+zzz"));
    }

    #[test]
    fn test_update_type_from() {
        assert_eq!(v("2.0.0").update_type_from(&v("1.9.1")), UpdateType::SemverMajor);
        assert_eq!(v("1.10.0").update_type_from(&v("1.9.1")), UpdateType::SemverMinor);
        assert_eq!(v("1.9.2").update_type_from(&v("1.9.1")), UpdateType::SemverPatch);
    }

    #[test]
    fn test_update_type_config_strings() {
        assert_eq!(UpdateType::SemverMajor.as_config_str(), "semver-major");
        assert_eq!(UpdateType::SemverMinor.as_group_rule_str(), "minor");
    }

    #[test]
    fn test_display_preserves_raw() {
        assert_eq!(v("v1.2.3-rc.1").to_string(), "v1.2.3-rc.1");
    }

    #[test]
    fn test_sorting() {
        let mut versions = vec![v("1.0.0"), v("1.0.0-alpha"), v("0.9.0"), v("1.0.1")];
        versions.sort();
        let raw: Vec<&str> = versions.iter().map(|ver| ver.as_str()).collect();
        assert_eq!(raw, vec!["0.9.0", "1.0.0-alpha", "1.0.0", "1.0.1"]);
    }
}
