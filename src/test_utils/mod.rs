//! Test utilities for bosh-render
//!
//! - [`init_test_logging`] installs a test-friendly tracing subscriber once
//! - [`erb_engine_available`] lets Ruby-dependent tests skip on hosts without
//!   Ruby or the `bosh-template` gem
//! - [`assets_dir`] and [`JobFixture`] provide job specs and templates
//!
//! # Example
//!
//! ```rust,no_run
//! use bosh_render_cli::test_utils::{JobFixture, erb_engine_available};
//!
//! # async fn example() {
//! if !erb_engine_available().await {
//!     return;
//! }
//! let job = JobFixture::new("simple")
//!     .property("foo", Some("baz"))
//!     .template("simple_test.erb", "config/simple", "<%= p('foo') %>\n");
//! let dir = job.write().unwrap();
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::engine::{EngineConfig, ErbEngine, ExpansionEngine};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; logs nothing when neither is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Whether the default ERB engine (Ruby plus `bosh-template`) can run here.
///
/// Prints a note when it cannot, so skipped tests are visible with `--nocapture`.
pub async fn erb_engine_available() -> bool {
    match ErbEngine::new(&EngineConfig::default()).check_available().await {
        Ok(()) => true,
        Err(err) => {
            eprintln!("skipping ERB test: {err}");
            false
        }
    }
}

/// Directory holding the shared test assets (`tests/assets`).
#[must_use]
pub fn assets_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("assets")
}

/// Builder for a job directory (`spec` plus `templates/`) in a temp dir.
#[derive(Debug, Clone, Default)]
pub struct JobFixture {
    name: String,
    properties: Vec<(String, Option<String>)>,
    templates: Vec<(String, String, String)>,
}

impl JobFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a property, with a YAML default if given.
    #[must_use]
    pub fn property(mut self, name: &str, default: Option<&str>) -> Self {
        self.properties.push((name.to_string(), default.map(str::to_string)));
        self
    }

    /// Add a template with its destination and body.
    #[must_use]
    pub fn template(mut self, source: &str, destination: &str, body: &str) -> Self {
        self.templates.push((source.to_string(), destination.to_string(), body.to_string()));
        self
    }

    /// The job spec YAML this fixture writes.
    #[must_use]
    pub fn spec_yaml(&self) -> String {
        let mut yaml = format!("---\nname: {}\n", self.name);

        yaml.push_str("templates:");
        if self.templates.is_empty() {
            yaml.push_str(" {}");
        }
        yaml.push('\n');
        for (source, destination, _) in &self.templates {
            yaml.push_str(&format!("  {source}: {destination}\n"));
        }

        yaml.push_str("properties:");
        if self.properties.is_empty() {
            yaml.push_str(" ~");
        }
        yaml.push('\n');
        for (name, default) in &self.properties {
            match default {
                Some(default) => yaml.push_str(&format!("  {name}:\n    default: {default}\n")),
                None => yaml.push_str(&format!("  {name}:\n    description: no default\n")),
            }
        }
        yaml
    }

    /// Write the job into a new temp dir; the job directory is its root.
    pub fn write(&self) -> std::io::Result<TempDir> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("spec"), self.spec_yaml())?;

        let templates = dir.path().join(crate::job::TEMPLATES_DIR);
        std::fs::create_dir_all(&templates)?;
        for (source, _, body) in &self.templates {
            let path = templates.join(source);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, body)?;
        }
        Ok(dir)
    }
}
