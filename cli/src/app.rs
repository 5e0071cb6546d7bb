//! The `easeml` application: argument dispatch over the schema and dataset engines.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use easeml_dataset_core::{Dataset, GenerateOptions, LocalOpener};
use easeml_schema_core::Schema;
use rand::SeedableRng;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::types::{DatasetCommand, EaseMlCli, EaseMlCommand, SchemaCommand};

/// Owns the parsed arguments and runs the selected command.
pub struct EaseMlApp {
    cli: EaseMlCli,
}

impl EaseMlApp {
    #[must_use]
    pub fn new(cli: EaseMlCli) -> Self {
        Self { cli }
    }

    /// Install the tracing subscriber, then run the selected subcommand.
    ///
    /// Errors are logged and turned into a process exit code by `main`; this
    /// method never panics on a user-facing failure.
    pub fn run(&self) -> Result<()> {
        self.init_logging();
        info!("starting easeml");

        match self.execute_command() {
            Ok(()) => {
                info!("command completed successfully");
                Ok(())
            }
            Err(err) => {
                error!("command failed: {err}");
                if !self.cli.quiet {
                    eprintln!("error: {err}");
                }
                Err(err)
            }
        }
    }

    fn init_logging(&self) {
        let filter = if self.cli.quiet {
            EnvFilter::new("error")
        } else if self.cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_env("EASEML_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
        };
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
    }

    fn execute_command(&self) -> Result<()> {
        match &self.cli.command {
            EaseMlCommand::Schema { command } => self.execute_schema_command(command),
            EaseMlCommand::Dataset { command } => self.execute_dataset_command(command),
        }
    }

    fn execute_schema_command(&self, command: &SchemaCommand) -> Result<()> {
        match command {
            SchemaCommand::Validate { src } => {
                let schema = read_schema(src)?;
                debug!(nodes = schema.nodes.len(), "schema is structurally valid");
                println!("valid: {} node(s)", schema.nodes.len());
                Ok(())
            }
            SchemaCommand::Match { src, dst } => {
                let source = read_schema(src)?;
                let dest = read_schema(dst)?;
                match easeml_schema_core::match_schema(&dest, &source) {
                    Some(resolved) => {
                        println!("{}", serde_json::to_string_pretty(&resolved.to_value())?);
                        Ok(())
                    }
                    None => Err(anyhow!("source schema does not match destination schema")),
                }
            }
        }
    }

    fn execute_dataset_command(&self, command: &DatasetCommand) -> Result<()> {
        match command {
            DatasetCommand::Validate { root } => {
                let schema = infer_dataset_schema(root)?;
                println!("{}", serde_json::to_string_pretty(&schema.to_value())?);
                Ok(())
            }
            DatasetCommand::Match { root, schema } => {
                let source = infer_dataset_schema(root)?;
                let dest = read_schema(schema)?;
                match easeml_schema_core::match_schema(&dest, &source) {
                    Some(resolved) => {
                        println!("{}", serde_json::to_string_pretty(&resolved.to_value())?);
                        Ok(())
                    }
                    None => Err(anyhow!("dataset does not match destination schema")),
                }
            }
            DatasetCommand::Generate { root, schema, samples, instances, seed } => {
                let schema = read_schema(schema)?;
                let opts = GenerateOptions { num_samples: *samples, num_node_instances: *instances };
                let mut rng = match seed {
                    Some(seed) => rand::rngs::StdRng::seed_from_u64(*seed),
                    None => rand::rngs::StdRng::from_entropy(),
                };
                let dataset = Dataset::generate(&mut rng, &schema, opts)
                    .context("failed to generate dataset from schema")?;
                let opener = LocalOpener::new(root);
                dataset.dump(&opener).context("failed to write generated dataset")?;
                info!(root = %root.display(), samples = *samples, "generated dataset");
                Ok(())
            }
        }
    }
}

fn read_schema(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read schema file '{}'", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("'{}' is not valid JSON", path.display()))?;
    Schema::from_value(&value).map_err(|err| anyhow!("{}: {}", err.path, err.message))
}

fn infer_dataset_schema(root: &Path) -> Result<Schema> {
    let opener = LocalOpener::new(root);
    let dataset = Dataset::load(&opener, true).context("failed to load dataset")?;
    dataset.infer_schema().map_err(|err| anyhow!("{}: {}", err.path, err.message))
}
