//! Arguments and helpers shared by several commands.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::config::RendererConfig;
use crate::context::RenderInputs;
use crate::engine::{EngineConfig, EngineKind};
use crate::instance::InstanceFacts;
use crate::job::JobSpec;
use crate::properties::PropertySchema;
use crate::utils::read_yaml_file;

/// Where the deployment-side inputs come from.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Context document: `properties`, optional `consumes` and `instance`
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Instance facts document; replaces the context's `instance` section
    #[arg(long, value_name = "FILE")]
    pub instance: Option<PathBuf>,
}

impl InputArgs {
    /// Load the render inputs. Missing documents mean empty inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if a named document cannot be read or parsed.
    pub fn load(&self) -> Result<RenderInputs> {
        let mut inputs = match &self.context {
            Some(path) => read_yaml_file::<Option<RenderInputs>>(path)
                .with_context(|| format!("Failed to load context document {}", path.display()))?
                .unwrap_or_default(),
            None => RenderInputs::default(),
        };

        if let Some(path) = &self.instance {
            let facts: Option<InstanceFacts> = read_yaml_file(path)
                .with_context(|| format!("Failed to load instance document {}", path.display()))?;
            inputs.instance = facts.unwrap_or_default();
        }

        Ok(inputs)
    }
}

/// Engine settings that override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Expansion engine
    #[arg(long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Ruby interpreter name or path
    #[arg(long, value_name = "PATH")]
    pub ruby: Option<PathBuf>,

    /// `gem` command name or path
    #[arg(long, value_name = "PATH")]
    pub gem: Option<PathBuf>,

    /// Per-template timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl EngineArgs {
    /// Apply the overrides to a loaded configuration.
    #[must_use]
    pub fn apply(&self, settings: &RendererConfig) -> RendererConfig {
        let mut settings = settings.clone();
        if let Some(engine) = self.engine {
            settings.engine = engine;
        }
        if let Some(ruby) = &self.ruby {
            settings.ruby.clone_from(ruby);
        }
        if let Some(gem) = &self.gem {
            settings.gem.clone_from(gem);
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        settings
    }

    #[must_use]
    pub fn engine_config(&self, settings: &RendererConfig) -> EngineConfig {
        self.apply(settings).engine_config()
    }
}

/// Load a job spec and its schema, or an empty schema when no spec is given.
///
/// # Errors
///
/// Returns an error if the spec cannot be loaded or declares malformed properties.
pub fn load_schema(spec: Option<&Path>) -> Result<(Option<JobSpec>, PropertySchema)> {
    match spec {
        Some(path) => {
            let job = JobSpec::load(path).with_context(|| format!("Failed to load job spec {}", path.display()))?;
            let schema = job.schema()?;
            Ok((Some(job), schema))
        }
        None => Ok((None, PropertySchema::new())),
    }
}
