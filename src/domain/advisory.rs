//! Security advisory matching

use super::dependency::Dependency;
use super::requirement::VersionRange;
use super::version::Version;

/// A security advisory against one dependency name, with affected and
/// safe version ranges already normalized.
#[derive(Debug, Clone)]
pub struct SecurityAdvisory {
    /// The dependency the advisory applies to
    pub dependency_name: String,
    /// Ranges of vulnerable versions, any match counts
    pub vulnerable_ranges: Vec<VersionRange>,
    /// Patched and unaffected ranges, any match clears the version
    pub safe_ranges: Vec<VersionRange>,
}

impl SecurityAdvisory {
    /// Builds an advisory from raw range strings. Range strings that do
    /// not parse are dropped; the caller logs them.
    pub fn new(
        dependency_name: impl Into<String>,
        affected: &[String],
        patched: &[String],
        unaffected: &[String],
    ) -> Self {
        let parse_all = |ranges: &[String]| -> Vec<VersionRange> {
            ranges.iter().filter_map(|r| VersionRange::parse(r)).collect()
        };
        Self {
            dependency_name: dependency_name.into(),
            vulnerable_ranges: parse_all(affected),
            safe_ranges: parse_all(patched)
                .into_iter()
                .chain(parse_all(unaffected))
                .collect(),
        }
    }

    /// True when `version` falls in an affected range and no safe range.
    pub fn vulnerable(&self, version: &Version) -> bool {
        if self.safe_ranges.iter().any(|r| r.satisfied_by(version)) {
            return false;
        }
        self.vulnerable_ranges.iter().any(|r| r.satisfied_by(version))
    }

    /// True when the dependency's update crossed from a vulnerable
    /// previous version to a non-vulnerable current one.
    pub fn fixed_by(&self, dependency: &Dependency) -> bool {
        let Some(previous) = dependency.parsed_previous_version() else {
            return false;
        };
        let Some(current) = dependency.parsed_version() else {
            return false;
        };
        self.vulnerable(&previous) && !self.vulnerable(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisory() -> SecurityAdvisory {
        SecurityAdvisory::new(
            "dummy-pkg-a",
            &["< 1.3.0".to_string()],
            &[">= 1.3.0".to_string()],
            &[],
        )
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_vulnerable_in_affected_range() {
        assert!(advisory().vulnerable(&v("1.2.0")));
    }

    #[test]
    fn test_safe_range_wins() {
        assert!(!advisory().vulnerable(&v("1.3.0")));
        assert!(!advisory().vulnerable(&v("2.0.0")));
    }

    #[test]
    fn test_unaffected_range_clears() {
        let adv = SecurityAdvisory::new(
            "dummy-pkg-a",
            &["< 2.0.0".to_string()],
            &[],
            &["1.5.*".to_string()],
        );
        assert!(adv.vulnerable(&v("1.4.0")));
        assert!(!adv.vulnerable(&v("1.5.3")));
    }

    #[test]
    fn test_unparsable_ranges_are_dropped() {
        let adv = SecurityAdvisory::new(
            "dummy-pkg-a",
            &["< 1.3.0".to_string(), ">= banana".to_string()],
            &[],
            &[],
        );
        assert_eq!(adv.vulnerable_ranges.len(), 1);
        assert!(adv.vulnerable(&v("1.0.0")));
    }

    #[test]
    fn test_fixed_by() {
        let dep = Dependency::new("dummy-pkg-a", Some("1.3.0".into()), vec![], "cargo")
            .with_previous(Some("1.2.0".into()), vec![]);
        assert!(advisory().fixed_by(&dep));

        let still_vulnerable =
            Dependency::new("dummy-pkg-a", Some("1.2.5".into()), vec![], "cargo")
                .with_previous(Some("1.2.0".into()), vec![]);
        assert!(!advisory().fixed_by(&still_vulnerable));
    }

    #[test]
    fn test_fixed_by_without_previous_version() {
        let dep = Dependency::new("dummy-pkg-a", Some("1.3.0".into()), vec![], "cargo");
        assert!(!advisory().fixed_by(&dep));
    }
}
