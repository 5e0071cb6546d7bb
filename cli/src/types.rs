//! CLI type definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ease.ml schema and dataset tools
#[derive(Parser, Debug)]
#[command(name = "easeml", version, about = "ease.ml schema and dataset tools")]
pub struct EaseMlCli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: EaseMlCommand,
}

#[derive(Subcommand, Debug)]
pub enum EaseMlCommand {
    /// Operate on schema documents
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Operate on on-disk datasets
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommand {
    /// Parse a schema document and check its invariants
    Validate {
        /// Path to the schema JSON document
        src: PathBuf,
    },
    /// Check that a source schema satisfies a destination schema
    Match {
        /// Path to the source schema JSON document
        src: PathBuf,
        /// Path to the destination schema JSON document
        dst: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Infer and print the schema a dataset satisfies
    Validate {
        /// Dataset root directory
        root: PathBuf,
    },
    /// Infer a dataset's schema and check it against a destination schema
    Match {
        /// Dataset root directory
        root: PathBuf,
        /// Path to the destination schema JSON document
        schema: PathBuf,
    },
    /// Generate a random dataset satisfying a (fully concrete) schema
    Generate {
        /// Dataset root directory to write into
        root: PathBuf,
        /// Path to the schema JSON document
        schema: PathBuf,
        /// Number of samples to generate
        #[arg(long, default_value = "10")]
        samples: usize,
        /// Number of instances to generate per non-singleton node
        #[arg(long, default_value = "10")]
        instances: usize,
        /// Seed for the random number generator
        #[arg(long)]
        seed: Option<u64>,
    },
}
