//! Pattern specificity scoring
//!
//! When specificity enforcement is on, a dependency matching several
//! groups is assigned only to the group whose pattern describes it most
//! precisely. Scores:
//! - exact pattern match: 1000
//! - literal (wildcard-free) pattern: 500
//! - the universal `*` pattern: 1
//! - wildcard patterns: 100 minus 10 per wildcard, plus a length bonus
//!   of `max(len - 5, 0)`
//!
//! Groups holding the dependency as an explicit member score 1000.

use super::DependencyGroup;
use crate::domain::Dependency;
use crate::wildcard;

/// Base score for wildcard patterns.
const WILDCARD_BASE_SCORE: i64 = 100;
/// Penalty per wildcard character.
const WILDCARD_PENALTY: i64 = 10;
/// Pattern length above this earns a bonus point per character.
const LENGTH_BONUS_THRESHOLD: i64 = 5;

/// Calculates how specifically group patterns describe dependencies.
#[derive(Debug, Default)]
pub struct PatternSpecificityCalculator;

impl PatternSpecificityCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Scores one pattern against a dependency name.
    pub fn pattern_specificity(&self, pattern: &str, name: &str) -> i64 {
        if pattern == name {
            return 1000;
        }
        if pattern == "*" {
            return 1;
        }
        if !pattern.contains('*') {
            return 500;
        }
        let wildcards = wildcard::wildcard_count(pattern) as i64;
        let length_bonus = (pattern.len() as i64 - LENGTH_BONUS_THRESHOLD).max(0);
        WILDCARD_BASE_SCORE - wildcards * WILDCARD_PENALTY + length_bonus
    }

    /// Scores a group for a dependency: the best score among the
    /// group's matching patterns, or 1000 for explicit members.
    pub fn group_specificity(&self, group: &DependencyGroup, dependency: &Dependency) -> i64 {
        if group.contains(&dependency.name) {
            return 1000;
        }
        group
            .rules
            .patterns
            .iter()
            .filter(|pattern| wildcard::matches(pattern, &dependency.name))
            .map(|pattern| self.pattern_specificity(pattern, &dependency.name))
            .max()
            .unwrap_or(0)
    }

    /// True iff another group matching this dependency scores strictly
    /// higher than `group`.
    pub fn should_skip_due_to_specificity(
        &self,
        group: &DependencyGroup,
        dependency: &Dependency,
        all_groups: &[DependencyGroup],
    ) -> bool {
        let own_score = self.group_specificity(group, dependency);
        all_groups
            .iter()
            .filter(|other| other.name != group.name)
            .filter(|other| other.matches(&dependency.name))
            .any(|other| self.group_specificity(other, dependency) > own_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::GroupRules;

    fn calculator() -> PatternSpecificityCalculator {
        PatternSpecificityCalculator::new()
    }

    fn group(name: &str, patterns: &[&str]) -> DependencyGroup {
        DependencyGroup::new(
            name,
            GroupRules {
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
            None,
        )
    }

    fn dep(name: &str) -> Dependency {
        Dependency::new(name, Some("1.0.0".into()), vec![], "npm")
    }

    #[test]
    fn test_exact_match_scores_highest() {
        assert_eq!(calculator().pattern_specificity("nginx", "nginx"), 1000);
    }

    #[test]
    fn test_universal_wildcard_scores_lowest() {
        assert_eq!(calculator().pattern_specificity("*", "nginx"), 1);
    }

    #[test]
    fn test_literal_non_matching_pattern() {
        assert_eq!(calculator().pattern_specificity("nginx-exact", "nginx"), 500);
    }

    #[test]
    fn test_single_wildcard_penalty_and_length_bonus() {
        // base 100 - one wildcard + no bonus for a 5-char pattern
        assert_eq!(calculator().pattern_specificity("test*", "test-dep"), 90);
        // two wildcards, 6-char pattern earns one bonus point
        assert_eq!(calculator().pattern_specificity("*test*", "test-dep"), 81);
    }

    #[test]
    fn test_longer_patterns_score_higher() {
        let calc = calculator();
        let short = calc.pattern_specificity("doc*", "docker-compose");
        let long = calc.pattern_specificity("docker-very-long*", "docker-compose");
        assert!(long > short);
    }

    #[test]
    fn test_group_specificity_orders_groups() {
        let calc = calculator();
        let dependency = dep("docker-compose");
        let universal = calc.group_specificity(&group("all", &["*"]), &dependency);
        let prefixed = calc.group_specificity(&group("docker", &["docker*"]), &dependency);
        let exact = calc.group_specificity(&group("exact", &["docker-compose"]), &dependency);
        assert!(exact > prefixed);
        assert!(prefixed > universal);
        assert_eq!(exact, 1000);
        assert_eq!(universal, 1);
    }

    #[test]
    fn test_explicit_member_scores_highest() {
        let mut g = group("all", &["*"]);
        g.add_dependency(dep("docker-compose"));
        assert_eq!(calculator().group_specificity(&g, &dep("docker-compose")), 1000);
    }

    #[test]
    fn test_group_with_no_matching_pattern_scores_zero() {
        let g = group("other", &["nginx*"]);
        assert_eq!(calculator().group_specificity(&g, &dep("docker-compose")), 0);
    }

    #[test]
    fn test_should_skip_when_more_specific_group_exists() {
        let calc = calculator();
        let broad = group("broad", &["dummy-pkg-*"]);
        let exact = group("exact", &["dummy-pkg-a"]);
        let groups = vec![broad.clone(), exact.clone()];
        let dependency = dep("dummy-pkg-a");
        assert!(calc.should_skip_due_to_specificity(&broad, &dependency, &groups));
        assert!(!calc.should_skip_due_to_specificity(&exact, &dependency, &groups));
    }
}
