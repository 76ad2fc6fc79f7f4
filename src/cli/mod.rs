//! Command-line interface for bosh-render.
//!
//! # Commands
//!
//! - `render` - Render one template to one output file
//! - `job` - Render every template of a BOSH job directory
//! - `context` - Print the evaluation context a template would see
//! - `check` - Verify that the configured engine is available
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: config file (also `BOSH_RENDER_CONFIG`)
//!
//! `RUST_LOG` takes precedence over both logging flags.
//!
//! # Examples
//!
//! ```bash
//! # Render a single template
//! bosh-render render --spec jobs/web/spec --context deployment.yml \
//!     --instance instance.yml jobs/web/templates/config.yml.erb out/config/config.yml
//!
//! # Render a whole job with the in-process engine
//! bosh-render job jobs/web --output out/web --engine tera
//!
//! # Inspect what `spec` and `p(...)` will return
//! bosh-render context --spec jobs/web/spec --context deployment.yml
//! ```

mod check;
pub mod common;
mod context;
mod job;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{CONFIG_ENV, RendererConfig};

/// Logging and configuration settings derived from global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` when `RUST_LOG` decides
    pub log_level: Option<String>,
    /// Explicit config file path
    pub config_path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "bosh-render",
    about = "Render BOSH job templates outside a BOSH director",
    version,
    long_about = "bosh-render evaluates BOSH job templates (ERB, or Tera in process) against \
                  deployment properties, instance identity and consumed links."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true, env = CONFIG_ENV, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one template
    Render(render::RenderCommand),
    /// Render every template of a job
    Job(job::JobCommand),
    /// Print the evaluation context as JSON
    Context(context::ContextCommand),
    /// Check that the rendering engine is available
    Check(check::CheckCommand),
}

impl Cli {
    /// Initialize logging, load configuration and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error, with context for display through
    /// [`crate::core::user_friendly_error`].
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if std::env::var_os("RUST_LOG").is_some() {
            None
        } else if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Run the command with an already built [`CliConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the command fails.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let settings = RendererConfig::load_with_optional(config.config_path.as_deref()).await?;

        match self.command {
            Commands::Render(cmd) => cmd.execute(&settings).await,
            Commands::Job(cmd) => cmd.execute(&settings).await,
            Commands::Context(cmd) => cmd.execute().await,
            Commands::Check(cmd) => cmd.execute(&settings, config.config_path.as_deref()).await,
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `None` defers to `RUST_LOG`. Calling this twice is harmless.
pub fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
