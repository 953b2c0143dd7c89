//! Requirement-range parsing and matching
//!
//! Handles the range syntaxes that appear in job configuration
//! (ignore conditions, security advisories) and in manifests:
//! - operators: `>=1.0`, `>1.0`, `<=2.0`, `<2.0`, `=1.2.3`, `==1.2.3`
//! - caret and tilde: `^1.2.3`, `~1.2.3`
//! - wildcards: `1.*`, `1.2.x`, `*`
//! - intervals: `[1.0,2.0)`, `(,2.0]`, `[1.0]`
//! - comma-separated conjunctions: `>= 1.0, < 2.0`
//!
//! All syntaxes normalize to a conjunction of closed/open/wildcard
//! primitives over [`Version`].

use super::version::Version;
use std::fmt;

/// A single normalized bound or match primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Matches any version
    Any,
    /// Exactly this version
    Exact(Version),
    /// Strictly greater than
    Greater(Version),
    /// Greater than or equal
    GreaterOrEqual(Version),
    /// Strictly less than
    Less(Version),
    /// Less than or equal
    LessOrEqual(Version),
    /// Release-segment prefix match (`1.2.*` keeps `[1, 2]`)
    Prefix(Vec<u64>),
}

impl Constraint {
    fn satisfied_by(&self, version: &Version) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Exact(v) => version.cmp(v) == std::cmp::Ordering::Equal,
            Constraint::Greater(v) => version > v,
            Constraint::GreaterOrEqual(v) => version >= v,
            Constraint::Less(v) => version < v,
            Constraint::LessOrEqual(v) => version <= v,
            Constraint::Prefix(segments) => {
                let actual = [version.major(), version.minor(), version.patch()];
                segments.iter().zip(actual.iter()).all(|(want, got)| want == got)
            }
        }
    }
}

/// A conjunction of constraints parsed from one range string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    constraints: Vec<Constraint>,
    raw: String,
}

impl VersionRange {
    /// Parses a range string. Returns None for syntax this comparator
    /// cannot normalize; callers skip the rule and log a warning.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() || raw == "*" {
            return Some(Self {
                constraints: vec![Constraint::Any],
                raw: raw.to_string(),
            });
        }

        let constraints = if raw.starts_with('[') || raw.starts_with('(') {
            parse_interval(raw)?
        } else {
            let mut parsed = Vec::new();
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                parsed.push(parse_operator(part)?);
            }
            parsed.into_iter().flatten().collect()
        };

        Some(Self {
            constraints,
            raw: raw.to_string(),
        })
    }

    /// Builds a range from already-normalized constraints.
    pub fn from_constraints(constraints: Vec<Constraint>, raw: impl Into<String>) -> Self {
        Self {
            constraints,
            raw: raw.into(),
        }
    }

    /// Returns true if every constraint admits `version`.
    pub fn satisfied_by(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.satisfied_by(version))
    }

    /// The original range string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parses one operator-prefixed (or bare, or wildcard) requirement part.
fn parse_operator(part: &str) -> Option<Vec<Constraint>> {
    let (op, rest) = split_operator(part);
    let rest = rest.trim();

    // Wildcard forms normalize to a prefix primitive
    if op.is_empty() && rest.split('.').any(|s| s == "*" || s == "x") {
        return parse_wildcard(rest).map(|c| vec![c]);
    }

    let version = Version::parse(rest)?;
    let constraints = match op {
        "" | "=" | "==" => vec![Constraint::Exact(version)],
        ">" => vec![Constraint::Greater(version)],
        ">=" => vec![Constraint::GreaterOrEqual(version)],
        "<" => vec![Constraint::Less(version)],
        "<=" => vec![Constraint::LessOrEqual(version)],
        "^" => {
            let upper = caret_upper_bound(&version);
            vec![Constraint::GreaterOrEqual(version), Constraint::Less(upper)]
        }
        "~" | "~>" => {
            let upper = tilde_upper_bound(&version);
            vec![Constraint::GreaterOrEqual(version), Constraint::Less(upper)]
        }
        _ => return None,
    };
    Some(constraints)
}

fn split_operator(part: &str) -> (&str, &str) {
    for op in [">=", "<=", "==", "~>", ">", "<", "=", "^", "~"] {
        if let Some(rest) = part.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", part)
}

fn parse_wildcard(pattern: &str) -> Option<Constraint> {
    let mut segments = Vec::new();
    for segment in pattern.split('.') {
        if segment == "*" || segment == "x" {
            return Some(Constraint::Prefix(segments));
        }
        segments.push(segment.parse::<u64>().ok()?);
    }
    // "1.2" without a wildcard tail is not a wildcard form
    None
}

fn caret_upper_bound(version: &Version) -> Version {
    let bound = if version.major() > 0 {
        format!("{}.0.0", version.major() + 1)
    } else if version.minor() > 0 {
        format!("0.{}.0", version.minor() + 1)
    } else {
        format!("0.0.{}", version.patch() + 1)
    };
    Version::parse(&bound).expect("bound is always numeric")
}

fn tilde_upper_bound(version: &Version) -> Version {
    let bound = format!("{}.{}.0", version.major(), version.minor() + 1);
    Version::parse(&bound).expect("bound is always numeric")
}

/// Parses interval syntax: `[1.0,2.0)`, `(,2.0]`, `[1.0]`.
fn parse_interval(raw: &str) -> Option<Vec<Constraint>> {
    let open_inclusive = raw.starts_with('[');
    let close_inclusive = raw.ends_with(']');
    if !close_inclusive && !raw.ends_with(')') {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];

    let (lower, upper) = match inner.split_once(',') {
        Some((l, u)) => (l.trim(), u.trim()),
        // `[1.0]` pins the exact version
        None => {
            let version = Version::parse(inner.trim())?;
            return if open_inclusive && close_inclusive {
                Some(vec![Constraint::Exact(version)])
            } else {
                None
            };
        }
    };

    let mut constraints = Vec::new();
    if !lower.is_empty() {
        let version = Version::parse(lower)?;
        constraints.push(if open_inclusive {
            Constraint::GreaterOrEqual(version)
        } else {
            Constraint::Greater(version)
        });
    }
    if !upper.is_empty() {
        let version = Version::parse(upper)?;
        constraints.push(if close_inclusive {
            Constraint::LessOrEqual(version)
        } else {
            Constraint::Less(version)
        });
    }
    if constraints.is_empty() {
        constraints.push(Constraint::Any);
    }
    Some(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    #[test]
    fn test_exact() {
        let r = range("1.2.3");
        assert!(r.satisfied_by(&v("1.2.3")));
        assert!(!r.satisfied_by(&v("1.2.4")));
    }

    #[test]
    fn test_explicit_equality_operators() {
        assert!(range("=1.2.3").satisfied_by(&v("1.2.3")));
        assert!(range("==1.2.3").satisfied_by(&v("1.2.3")));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(range(">= 1.0").satisfied_by(&v("1.0.0")));
        assert!(range("> 1.0").satisfied_by(&v("1.0.1")));
        assert!(!range("> 1.0").satisfied_by(&v("1.0.0")));
        assert!(range("< 2.0").satisfied_by(&v("1.9.9")));
        assert!(range("<= 2.0").satisfied_by(&v("2.0.0")));
    }

    #[test]
    fn test_conjunction() {
        let r = range(">= 1.0, < 2.0");
        assert!(r.satisfied_by(&v("1.5.0")));
        assert!(!r.satisfied_by(&v("2.0.0")));
        assert!(!r.satisfied_by(&v("0.9.0")));
    }

    #[test]
    fn test_caret() {
        let r = range("^1.2.3");
        assert!(r.satisfied_by(&v("1.2.3")));
        assert!(r.satisfied_by(&v("1.9.0")));
        assert!(!r.satisfied_by(&v("2.0.0")));
        assert!(!r.satisfied_by(&v("1.2.2")));

        let zero = range("^0.3.1");
        assert!(zero.satisfied_by(&v("0.3.9")));
        assert!(!zero.satisfied_by(&v("0.4.0")));
    }

    #[test]
    fn test_tilde() {
        let r = range("~1.2.3");
        assert!(r.satisfied_by(&v("1.2.9")));
        assert!(!r.satisfied_by(&v("1.3.0")));
    }

    #[test]
    fn test_wildcard_star() {
        assert!(range("*").satisfied_by(&v("99.0.0")));
    }

    #[test]
    fn test_wildcard_prefix() {
        let r = range("1.*");
        assert!(r.satisfied_by(&v("1.0.0")));
        assert!(r.satisfied_by(&v("1.99.0")));
        assert!(!r.satisfied_by(&v("2.0.0")));

        let minor = range("1.2.x");
        assert!(minor.satisfied_by(&v("1.2.7")));
        assert!(!minor.satisfied_by(&v("1.3.0")));
    }

    #[test]
    fn test_interval_half_open() {
        let r = range("[1.0,2.0)");
        assert!(r.satisfied_by(&v("1.0.0")));
        assert!(r.satisfied_by(&v("1.9.9")));
        assert!(!r.satisfied_by(&v("2.0.0")));
    }

    #[test]
    fn test_interval_open_lower() {
        let r = range("(1.0,2.0]");
        assert!(!r.satisfied_by(&v("1.0.0")));
        assert!(r.satisfied_by(&v("2.0.0")));
    }

    #[test]
    fn test_interval_unbounded_lower() {
        let r = range("(,2.0]");
        assert!(r.satisfied_by(&v("0.1.0")));
        assert!(!r.satisfied_by(&v("2.0.1")));
    }

    #[test]
    fn test_interval_exact_pin() {
        let r = range("[1.5.0]");
        assert!(r.satisfied_by(&v("1.5.0")));
        assert!(!r.satisfied_by(&v("1.5.1")));
    }

    #[test]
    fn test_unparsable_returns_none() {
        assert!(VersionRange::parse(">= banana").is_none());
        assert!(VersionRange::parse("[1.0,2.0").is_none());
        assert!(VersionRange::parse(">= 1.0, ,").is_none());
    }

    #[test]
    fn test_from_constraints() {
        let r = VersionRange::from_constraints(
            vec![Constraint::GreaterOrEqual(v("2.0.0"))],
            ">= 2.0.0",
        );
        assert!(r.satisfied_by(&v("2.1.0")));
        assert!(!r.satisfied_by(&v("1.9.0")));
    }
}
