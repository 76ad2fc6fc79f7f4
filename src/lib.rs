//! bosh-render - render BOSH job templates outside a BOSH director
//!
//! A BOSH job ships templates (usually ERB) that read deployment properties,
//! the identity of the instance being rendered and links to other jobs. This
//! crate reproduces that evaluation locally so that configuration files can be
//! produced for containers, tests or any other non-BOSH runtime.
//!
//! # Pipeline
//!
//! ```text
//! job spec ──► PropertySchema ─┐
//! deployment values ───────────┼─► properties::resolve ─► ResolvedProperties ─┐
//! instance facts ──────────────┼─► InstanceDescriptor::build ─────────────────┼─► EvaluationContext
//! consumes declarations ───────┴─► LinkResolver::resolve ─► LinkSet ──────────┘          │
//!                                                                                        ▼
//!                                template ─► RenderDriver (engine check, expand, atomic write) ─► output file
//! ```
//!
//! # Core Modules
//!
//! - [`properties`] - Property schemas, dotted paths and default merging
//! - [`instance`] - Instance identity, bootstrap derivation, default network
//! - [`links`] - Consumed links and their instances
//! - [`context`] - Evaluation context assembly and the engine spec document
//! - [`engine`] - ERB (Ruby subprocess) and Tera (in process) expansion engines
//! - [`render`] - Single-template render driver
//! - [`job`] - Job specs and concurrent rendering of a job's templates
//!
//! # Supporting Modules
//!
//! - [`core`] - Error types and user-facing error formatting
//! - [`config`] - TOML configuration file
//! - [`cli`] - `bosh-render` command-line interface
//! - [`utils`] - Atomic writes and YAML loading
//!
//! # Example
//!
//! ```rust,no_run
//! use bosh_render_cli::context::RenderInputs;
//! use bosh_render_cli::engine::EngineConfig;
//! use bosh_render_cli::job::JobSpec;
//! use bosh_render_cli::links::LinkResolver;
//! use bosh_render_cli::render::RenderDriver;
//! use bosh_render_cli::utils::read_yaml_file;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let job = JobSpec::load(Path::new("jobs/web/spec"))?;
//! let inputs: RenderInputs = read_yaml_file(Path::new("deployment.yml"))?;
//! let context = inputs.assemble(&job.schema()?, &LinkResolver::new())?.with_job_name(&job.name);
//!
//! let driver = RenderDriver::from_config(&EngineConfig::default());
//! driver
//!     .render(&context, Path::new("jobs/web/templates/ctl.erb"), Path::new("out/web/bin/ctl"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod engine;
pub mod instance;
pub mod job;
pub mod links;
pub mod properties;
pub mod render;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
