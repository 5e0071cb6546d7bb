//! Identifier syntax shared by node, field, class and dimension names.

use once_cell::sync::Lazy;
use regex::Regex;

/// Names of nodes, fields, classes and source names: lowercase ASCII
/// letters, digits and underscores, starting with a letter or underscore.
pub static NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][0-9a-z_]*$").expect("static regex"));

/// Dimension identifiers additionally allow a single trailing wildcard
/// suffix: `?`, `+` or `*`.
pub static DIM_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][0-9a-z_]*[+?*]?$").expect("static regex"));

/// Whether `s` is a valid plain identifier (node, field, class or source name).
#[must_use]
pub fn is_name(s: &str) -> bool {
    NAME_FORMAT.is_match(s)
}

/// Whether `s` is a valid dimension identifier, optionally wildcard-suffixed.
#[must_use]
pub fn is_dim_name(s: &str) -> bool {
    DIM_FORMAT.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_reject_wildcards() {
        assert!(is_name("node_1"));
        assert!(!is_name("node?"));
        assert!(!is_name("1node"));
        assert!(!is_name(""));
    }

    #[test]
    fn dim_names_accept_a_single_trailing_wildcard() {
        assert!(is_dim_name("w"));
        assert!(is_dim_name("w?"));
        assert!(is_dim_name("w_2*"));
        assert!(!is_dim_name("w+?"));
    }
}
