//! BOSH job specs and batch rendering of a job's templates.
//!
//! A job spec is the YAML file shipped with every BOSH job:
//!
//! ```yaml
//! name: web
//! templates:
//!   ctl.erb: bin/ctl
//!   config.yml.erb: config/config.yml
//! properties:
//!   web.port:
//!     description: Port to listen on
//!     default: 8080
//!   web.tls.cert: ~
//! ```
//!
//! [`JobRenderer`] renders every template of a job against one evaluation
//! context. Templates render concurrently, each with its own engine workspace,
//! and every template gets its own result: one failing template does not stop
//! the others.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::context::{EvaluationContext, RenderInputs};
use crate::core::{RenderError, Result};
use crate::engine::{Engine, ExpansionEngine};
use crate::links::LinkResolver;
use crate::properties::PropertySchema;
use crate::render::{RenderDriver, RenderedOutput};
use crate::utils::read_yaml_file;

/// File names a job spec may have inside a job directory, in lookup order.
pub const SPEC_FILE_NAMES: &[&str] = &["spec", "job.MF"];

/// Directory holding a job's templates, relative to the job directory.
pub const TEMPLATES_DIR: &str = "templates";

/// Default number of templates rendered at once.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// A parsed BOSH job spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Template source (relative to `templates/`) to destination (relative to the job output)
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    /// Raw `properties` section; `null` or missing means no properties
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl JobSpec {
    /// Load a job spec file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] when the file cannot be read and
    /// [`RenderError::DataShape`] when it is not a job spec.
    pub fn load(path: &Path) -> Result<Self> {
        let spec: Self = read_yaml_file(path)?;
        tracing::debug!(
            "Loaded job spec '{}' from {} ({} template(s))",
            spec.name,
            path.display(),
            spec.templates.len()
        );
        Ok(spec)
    }

    /// Locate the spec file inside a job directory.
    #[must_use]
    pub fn find_in(job_dir: &Path) -> Option<PathBuf> {
        SPEC_FILE_NAMES.iter().map(|name| job_dir.join(name)).find(|path| path.is_file())
    }

    /// The property schema declared by this job.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when a property entry is malformed.
    pub fn schema(&self) -> Result<PropertySchema> {
        match &self.properties {
            Some(section) => PropertySchema::from_spec_section(section),
            None => Ok(PropertySchema::new()),
        }
    }
}

/// Outcome of rendering one template of a job.
#[derive(Debug)]
pub struct TemplateResult {
    pub template: PathBuf,
    pub destination: PathBuf,
    pub outcome: Result<RenderedOutput>,
}

/// Outcome of rendering a whole job.
#[derive(Debug)]
pub struct JobRenderReport {
    pub job: String,
    /// One entry per template, sorted by template path
    pub results: Vec<TemplateResult>,
}

impl JobRenderReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RenderedOutput> {
        self.results.iter().filter_map(|result| result.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &RenderError)> {
        self.results
            .iter()
            .filter_map(|result| result.outcome.as_ref().err().map(|err| (result.template.as_path(), err)))
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|result| result.outcome.is_ok())
    }
}

/// Renders every template of a job.
#[derive(Debug, Clone)]
pub struct JobRenderer<E = Engine> {
    driver: RenderDriver<E>,
    max_parallel: usize,
}

impl<E: ExpansionEngine> JobRenderer<E> {
    pub fn new(driver: RenderDriver<E>) -> Self {
        Self {
            driver,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Limit how many templates render at once (at least one).
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Assemble the context for `job` and render all of its templates.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the engine is unavailable or the inputs do
    /// not fit the job's schema. Per-template failures are reported in the
    /// returned [`JobRenderReport`].
    pub async fn render_job(
        &self,
        job: &JobSpec,
        templates_dir: &Path,
        inputs: &RenderInputs,
        resolver: &LinkResolver,
        output_dir: &Path,
    ) -> Result<JobRenderReport> {
        self.driver.check().await?;

        let context = inputs.assemble(&job.schema()?, resolver)?.with_job_name(job.name.clone());
        Ok(self.render_templates(job, templates_dir, &context, output_dir).await)
    }

    /// Render all templates of `job` against an already assembled context.
    pub async fn render_templates(
        &self,
        job: &JobSpec,
        templates_dir: &Path,
        context: &EvaluationContext,
        output_dir: &Path,
    ) -> JobRenderReport {
        tracing::info!(
            "Rendering {} template(s) of job '{}' (max {} at once)",
            job.templates.len(),
            job.name,
            self.max_parallel
        );

        let mut results: Vec<TemplateResult> = stream::iter(&job.templates)
            .map(|(source, destination)| {
                let template = templates_dir.join(source);
                let destination = output_dir.join(destination);
                async move {
                    let outcome = self.driver.render(context, &template, &destination).await;
                    if let Err(err) = &outcome {
                        tracing::warn!("Failed to render {}: {}", template.display(), err);
                    }
                    TemplateResult {
                        template,
                        destination,
                        outcome,
                    }
                }
            })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;

        results.sort_by(|a, b| a.template.cmp(&b.template));
        JobRenderReport {
            job: job.name.clone(),
            results,
        }
    }
}
