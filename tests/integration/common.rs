//! Shared helpers for the integration tests.

use assert_cmd::Command;
use bosh_render_cli::context::{EvaluationContext, RenderInputs};
use bosh_render_cli::core::Result;
use bosh_render_cli::engine::{EngineConfig, EngineKind};
use bosh_render_cli::instance::InstanceFacts;
use bosh_render_cli::job::JobSpec;
use bosh_render_cli::links::LinkResolver;
use bosh_render_cli::render::RenderDriver;
use bosh_render_cli::test_utils::{assets_dir, init_test_logging};
use bosh_render_cli::utils::read_yaml_file;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn asset(name: &str) -> PathBuf {
    assets_dir().join(name)
}

/// Deployment properties and consumes from `deployment.yml`, with the
/// instance facts from `instance.yml`.
pub fn deployment_inputs() -> RenderInputs {
    let mut inputs: RenderInputs = read_yaml_file(&asset("deployment.yml")).unwrap();
    inputs.instance = read_yaml_file::<InstanceFacts>(&asset("instance.yml")).unwrap();
    inputs
}

/// Assemble the context a job's templates are rendered against.
pub fn context_for(spec_file: &str, inputs: &RenderInputs) -> Result<EvaluationContext> {
    let job = JobSpec::load(&asset(spec_file))?;
    Ok(inputs.assemble(&job.schema()?, &LinkResolver::new())?.with_job_name(job.name))
}

pub fn engine_config(kind: EngineKind) -> EngineConfig {
    EngineConfig {
        kind,
        ..EngineConfig::default()
    }
}

/// Render an asset template into a temp dir and return the output text.
pub async fn render_asset(
    kind: EngineKind,
    spec_file: &str,
    template: &str,
    inputs: &RenderInputs,
) -> Result<String> {
    init_test_logging(None);

    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("out").join(template);
    let context = context_for(spec_file, inputs)?;

    RenderDriver::from_config(&engine_config(kind))
        .render(&context, &asset(template), &destination)
        .await?;
    Ok(std::fs::read_to_string(&destination).unwrap())
}

/// `bosh-render` with an empty config file, so the host's config is never read.
pub fn bosh_render(temp: &Path) -> Command {
    let config = temp.join("bosh-render.toml");
    if !config.exists() {
        std::fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("bosh-render").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}
