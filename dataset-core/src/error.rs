//! Error type produced by dataset loading, inference and generation.
//!
//! Mirrors `easeml_schema_core::SchemaError`'s shape, but anchors its
//! diagnostics to a filesystem-style path (a sample directory, a node
//! directory, a specific file) rather than a JSON path

use thiserror::Error;

/// An error raised while loading, inferring from, or generating a dataset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at {path})")]
pub struct DatasetError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Filesystem-style path to the offending file or directory.
    pub path: String,
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    /// Create a new error with no path information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), path: String::new() }
    }

    /// Create a new error already anchored at `path`.
    #[must_use]
    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self { message: message.into(), path: path.into() }
    }

    /// Return a copy of this error anchored at `path`, if it is not already.
    #[must_use]
    pub fn with_path_if_empty(mut self, path: impl Into<String>) -> Self {
        if self.path.is_empty() {
            self.path = path.into();
        }
        self
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {err}"))
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        Self::new(format!("malformed CSV: {err}"))
    }
}

impl From<easeml_schema_core::SchemaError> for DatasetError {
    fn from(err: easeml_schema_core::SchemaError) -> Self {
        Self { message: err.message, path: err.path }
    }
}
