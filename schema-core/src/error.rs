//! Error type produced by schema construction, parsing and invariant checks.
//!
//! Matching never raises `SchemaError`: a failed match is expressed as an
//! absent result (`None`), not an error. See [`crate::matcher`].

use thiserror::Error;

/// An error raised while building, parsing or validating a [`crate::types::Schema`].
///
/// Carries a dotted JSON path (e.g. `nodes.x.fields.y`) pointing at the
/// offending element, mirroring the structure of the schema JSON itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at {path})")]
pub struct SchemaError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Dotted path to the offending schema element, empty if not localized.
    pub path: String,
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Create a new error with no path information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
        }
    }

    /// Create a new error already anchored at `path`.
    #[must_use]
    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Return a copy of this error with `prefix` prepended to its path.
    ///
    /// Used when a nested load function (e.g. `Node::from_value`) bubbles an
    /// error up through `Schema::from_value`, which only knows the path
    /// segment of its immediate child.
    #[must_use]
    pub fn prefixed(mut self, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref();
        if self.path.is_empty() {
            self.path = prefix.to_string();
        } else {
            self.path = format!("{prefix}.{}", self.path);
        }
        self
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("malformed schema JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixing_builds_a_dotted_path() {
        let err = SchemaError::at("bad dim", "dim").prefixed("fields.x");
        assert_eq!(err.path, "fields.x.dim");
    }

    #[test]
    fn prefixing_an_empty_path_sets_it_directly() {
        let err = SchemaError::new("bad node").prefixed("nodes.a");
        assert_eq!(err.path, "nodes.a");
    }
}
