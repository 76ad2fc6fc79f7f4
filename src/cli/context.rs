//! Print the evaluation context.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::common::{InputArgs, load_schema};
use crate::links::LinkResolver;

/// Print the engine spec (`spec`, `properties`, `links`) a template would see, as JSON.
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Job spec declaring properties and defaults
    #[arg(long, value_name = "FILE")]
    spec: Option<PathBuf>,

    #[command(flatten)]
    inputs: InputArgs,
}

impl ContextCommand {
    pub async fn execute(self) -> Result<()> {
        let (job, schema) = load_schema(self.spec.as_deref())?;
        let inputs = self.inputs.load()?;

        let mut context = inputs.assemble(&schema, &LinkResolver::new())?;
        if let Some(job) = job {
            context = context.with_job_name(job.name);
        }

        let spec = context.to_engine_spec()?;
        let rendered = serde_json::to_string_pretty(&spec).context("Failed to format context")?;
        println!("{rendered}");
        Ok(())
    }
}
