//! Wildcard matching for dependency-name rules
//!
//! Allow rules, ignore conditions, group patterns and cooldown filters
//! all select dependencies by name with a single wildcard character:
//! `*` matches zero or more characters, anything else matches literally.
//! Matching is case-insensitive.

use regex::Regex;

/// Returns true if `pattern` matches the whole of `candidate`.
///
/// `*` is the only wildcard syntax; it is translated to an anchored
/// regex so partial matches never count (`bus*` does not match
/// `blunderbus`).
pub fn matches(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern.eq_ignore_ascii_case(candidate);
    }

    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for part in pattern.split('*') {
        translated.push_str(&regex::escape(part));
        translated.push_str(".*");
    }
    // The loop appends one ".*" too many
    translated.truncate(translated.len() - 2);
    translated.push('$');

    match Regex::new(&format!("(?i){}", translated)) {
        Ok(re) => re.is_match(candidate),
        Err(_) => false,
    }
}

/// Number of wildcard characters in a pattern, used by the specificity
/// calculator.
pub fn wildcard_count(pattern: &str) -> usize {
    pattern.matches('*').count()
}
