//! Render a single template.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{EngineArgs, InputArgs, load_schema};
use crate::config::RendererConfig;
use crate::links::LinkResolver;
use crate::render::RenderDriver;

/// Render one template against a job's properties and an instance.
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template to render
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Output file (parent directories are created)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Job spec declaring the template's properties; without it no property is visible
    #[arg(long, value_name = "FILE")]
    spec: Option<PathBuf>,

    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    engine: EngineArgs,
}

impl RenderCommand {
    pub async fn execute(self, settings: &RendererConfig) -> Result<()> {
        let (job, schema) = load_schema(self.spec.as_deref())?;
        let inputs = self.inputs.load()?;

        let mut context = inputs.assemble(&schema, &LinkResolver::new())?;
        if let Some(job) = job {
            context = context.with_job_name(job.name);
        }

        let driver = RenderDriver::from_config(&self.engine.engine_config(settings));
        let output = driver.render(&context, &self.template, &self.output).await?;

        println!(
            "{} {} -> {} ({} bytes)",
            "✓".green(),
            output.template.display(),
            output.destination.display(),
            output.bytes
        );
        Ok(())
    }
}
