//! # `easeml-schema-core`
//!
//! A typed, graph-aware schema model for ease.ml datasets: validation and
//! matching.
//!
//! This crate defines the data model described in the ease.ml schema
//! language (nodes, fields, links and classes), and implements two pure,
//! in-memory operations over it:
//!
//! - **validation** — parsing a schema JSON document into a [`types::Schema`],
//!   enforcing its structural and referential invariants as part of
//!   construction;
//! - **matching** — deciding whether a concrete source schema can be
//!   accepted by a more abstract destination schema containing dimension
//!   variables, producing a resolved schema when it can.
//!
//! The dataset layer (loading, inference and generation) lives in the
//! sibling `easeml-dataset-core` crate, which depends on the types defined
//! here.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

/// Identifier syntax shared by node, field, class and dimension names.
pub mod ident;

/// Error type produced by schema construction, parsing and invariant checks.
pub mod error;

/// The dimension-list unifier.
pub mod dim;

/// The schema data model: nodes, fields, links, classes.
pub mod types;

/// Schema matching: deciding whether a source schema satisfies a destination.
pub mod matcher;

pub use error::{Result, SchemaError};
pub use matcher::{match_schema, matches};
pub use types::{Category, Class, ClassDim, Field, Link, LinkUpper, Node, Schema, Tensor};
