//! Render every template of a job directory.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{EngineArgs, InputArgs};
use crate::config::RendererConfig;
use crate::job::{JobRenderer, JobSpec, SPEC_FILE_NAMES, TEMPLATES_DIR};
use crate::links::LinkResolver;
use crate::render::RenderDriver;

/// Render all templates of a BOSH job.
///
/// The job directory holds the job spec (`spec` or `job.MF`) and a
/// `templates/` directory; each template is written to the output directory
/// at the destination the spec names.
#[derive(Args, Debug)]
pub struct JobCommand {
    /// Job directory
    #[arg(value_name = "JOB_DIR")]
    job_dir: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Templates rendered at once (defaults to the config's `max_parallel`)
    #[arg(long, value_name = "N")]
    max_parallel: Option<usize>,

    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    engine: EngineArgs,
}

impl JobCommand {
    pub async fn execute(self, settings: &RendererConfig) -> Result<()> {
        let spec_path = JobSpec::find_in(&self.job_dir).with_context(|| {
            format!(
                "No job spec found in {} (looked for {})",
                self.job_dir.display(),
                SPEC_FILE_NAMES.join(", ")
            )
        })?;
        let job = JobSpec::load(&spec_path)?;
        let inputs = self.inputs.load()?;

        let renderer = JobRenderer::new(RenderDriver::from_config(&self.engine.engine_config(settings)))
            .with_max_parallel(self.max_parallel.unwrap_or(settings.max_parallel));
        let report = renderer
            .render_job(&job, &self.job_dir.join(TEMPLATES_DIR), &inputs, &LinkResolver::new(), &self.output)
            .await
            .with_context(|| format!("Failed to render job '{}'", job.name))?;

        for result in &report.results {
            match &result.outcome {
                Ok(output) => println!(
                    "  {} {} -> {}",
                    "✓".green(),
                    result.template.display(),
                    output.destination.display()
                ),
                Err(err) => println!("  {} {}: {}", "✗".red(), result.template.display(), err),
            }
        }

        let failed = report.failures().count();
        if failed > 0 {
            bail!("{failed} of {} template(s) of job '{}' failed to render", report.results.len(), report.job);
        }

        println!(
            "\n{} {} template(s) of job '{}'",
            "Rendered".green().bold(),
            report.results.len(),
            report.job
        );
        Ok(())
    }
}
