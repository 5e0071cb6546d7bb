//! # `easeml-dataset-core`
//!
//! On-disk dataset loading, schema inference and dataset generation.
//!
//! A dataset is a directory tree recognized by file extension (tensors,
//! categories, classes, links) and traversed through a pluggable
//! [`opener::Opener`] abstraction. Three operations sit on top of the file
//! model:
//!
//! - **loading** ([`file`]) — parse a tree into typed [`file::DatasetFile`]
//!   nodes, optionally metadata-only for tensors;
//! - **inference** ([`infer`]) — derive an `easeml_schema_core::Schema` that
//!   the dataset satisfies;
//! - **generation** ([`generate`]) — the inverse: synthesize a random
//!   dataset tree from a fully concrete schema.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

/// Error type produced by dataset loading, inference and generation.
pub mod error;

/// The pluggable opener abstraction.
pub mod opener;

/// The default dense binary tensor container format.
pub mod npy;

/// Link records and the graph-property detectors.
pub mod links;

/// The typed file tree: directories, tensors, categories, classes and links.
pub mod file;

/// Schema inference over a loaded dataset.
pub mod infer;

/// Dataset generation from a fully concrete schema.
pub mod generate;

pub use error::{DatasetError, Result};
pub use file::{CategoryFile, ClassFile, DatasetFile, DirectoryFile, LinksFile, TensorFile, TensorSubtype};
pub use generate::{generate_from_schema, GenerateOptions};
pub use infer::infer_schema;
pub use opener::{LocalOpener, Opener};

use std::path::Path;

/// A dataset rooted at some opener-relative path: its typed children plus
/// the opener it was loaded through (or will be dumped through).
pub struct Dataset {
    pub children: indexmap::IndexMap<String, DatasetFile>,
}

impl Dataset {
    /// Load a dataset tree from `opener`, optionally skipping tensor payloads.
    pub fn load(opener: &dyn Opener, metadata_only: bool) -> Result<Self> {
        let children = file::load_directory_children(opener, Path::new(""), metadata_only)?;
        Ok(Self { children })
    }

    /// Write this dataset tree out through `opener`.
    pub fn dump(&self, opener: &dyn Opener) -> Result<()> {
        file::dump_directory_children(opener, Path::new(""), &self.children)
    }

    /// Derive the schema this dataset satisfies.
    pub fn infer_schema(&self) -> Result<easeml_schema_core::Schema> {
        infer::infer_schema(&self.children)
    }

    /// Synthesize a fresh dataset from a fully concrete schema.
    pub fn generate(rng: &mut impl rand::RngCore, schema: &easeml_schema_core::Schema, opts: GenerateOptions) -> Result<Self> {
        let children = generate::generate_from_schema(rng, schema, opts)?;
        Ok(Self { children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::InMemoryOpener;

    #[test]
    fn loads_and_infers_a_minimal_dataset() {
        let opener = InMemoryOpener::new();
        let mut buf = Vec::new();
        npy::write_array(&mut buf, &[2], &[1.0, 2.0]).unwrap();
        opener.seed("s/x.ten.npy", buf);

        let dataset = Dataset::load(&opener, true).unwrap();
        let schema = dataset.infer_schema().unwrap();
        assert!(schema.nodes.contains_key("x"));
        assert!(schema.nodes["x"].is_singleton);
    }
}
