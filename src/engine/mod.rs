//! Template expansion engines.
//!
//! An engine turns a template body plus an engine spec (see
//! [`EvaluationContext::to_engine_spec`]) into output bytes. Two engines are
//! available:
//!
//! - [`ErbEngine`]: evaluates ERB through Ruby and the `bosh-template` gem in
//!   a subprocess, exactly as BOSH does. Needs Ruby on the host.
//! - [`TeraEngine`]: evaluates Tera templates in process with the same
//!   `p`/`link` surface. Always available.
//!
//! [`Engine`] wraps either one and is what the render driver holds by default.
//!
//! [`EvaluationContext::to_engine_spec`]: crate::context::EvaluationContext::to_engine_spec

mod availability;
pub mod erb;
pub mod tera;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Result;

pub use erb::ErbEngine;
pub use tera::TeraEngine;

/// Default Ruby interpreter, looked up on `PATH`.
pub const DEFAULT_RUBY: &str = "ruby";
/// Default gem command, looked up on `PATH`.
pub const DEFAULT_GEM: &str = "gem";
/// Gem providing `Bosh::Template::EvaluationContext`.
pub const DEFAULT_GEM_NAME: &str = "bosh-template";
/// Default limit for one engine invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One template expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionRequest<'a> {
    /// Where the template was read from, for diagnostics
    pub template_path: &'a Path,
    /// Template body
    pub template: &'a str,
    /// Serialized evaluation context
    pub spec: &'a Value,
}

/// A template evaluator.
///
/// `check_available` must be called (and succeed) before `expand`; it is where
/// engines look for interpreters and extensions, and it never creates files.
pub trait ExpansionEngine {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Verify that everything the engine needs is present.
    fn check_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Evaluate one template, returning the output bytes unmodified.
    fn expand(&self, request: ExpansionRequest<'_>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Which engine to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Ruby ERB with `bosh-template`
    #[default]
    Erb,
    /// In-process Tera
    Tera,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Erb => write!(f, "erb"),
            EngineKind::Tera => write!(f, "tera"),
        }
    }
}

/// Explicit engine settings.
///
/// Nothing here is read from process globals; callers build it from
/// configuration and hand it to [`Engine::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Ruby interpreter name or path
    pub ruby: PathBuf,
    /// `gem` command name or path
    pub gem: PathBuf,
    /// Gem that must be installed for ERB rendering
    pub gem_name: String,
    /// Limit for one engine invocation (`None` waits forever)
    pub timeout: Option<Duration>,
    /// Directory that holds temporary engine workspaces (system temp dir if unset)
    pub workspace_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            ruby: PathBuf::from(DEFAULT_RUBY),
            gem: PathBuf::from(DEFAULT_GEM),
            gem_name: DEFAULT_GEM_NAME.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            workspace_root: None,
        }
    }
}

/// Either engine, selected at runtime.
#[derive(Debug, Clone)]
pub enum Engine {
    Erb(ErbEngine),
    Tera(TeraEngine),
}

impl Engine {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.kind {
            EngineKind::Erb => Engine::Erb(ErbEngine::new(config)),
            EngineKind::Tera => Engine::Tera(TeraEngine::new()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::Erb(_) => EngineKind::Erb,
            Engine::Tera(_) => EngineKind::Tera,
        }
    }
}

impl ExpansionEngine for Engine {
    fn name(&self) -> &'static str {
        match self {
            Engine::Erb(engine) => engine.name(),
            Engine::Tera(engine) => engine.name(),
        }
    }

    async fn check_available(&self) -> Result<()> {
        match self {
            Engine::Erb(engine) => engine.check_available().await,
            Engine::Tera(engine) => engine.check_available().await,
        }
    }

    async fn expand(&self, request: ExpansionRequest<'_>) -> Result<Vec<u8>> {
        match self {
            Engine::Erb(engine) => engine.expand(request).await,
            Engine::Tera(engine) => engine.expand(request).await,
        }
    }
}
