//! ERB expansion through Ruby and the `bosh-template` gem.
//!
//! Each expansion runs in its own temporary workspace holding the evaluator
//! script, a JSON request and the output file. The workspace is removed when
//! the expansion ends, whether it succeeded or not; a removal failure is
//! reported as [`RenderError::Cleanup`] carrying the expansion's own error.
//!
//! Availability (interpreter on `PATH`, gem installed) is checked before any
//! workspace exists and memoized per process once it succeeds.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use super::availability::{self, AvailabilityKey};
use super::{EngineConfig, ExpansionEngine, ExpansionRequest};
use crate::core::{FileOperation, IoResultExt, RenderError, Result};

/// Evaluator script run by the interpreter.
const EVALUATOR: &str = include_str!("render.rb");

const EVALUATOR_FILE: &str = "render.rb";
const REQUEST_FILE: &str = "request.json";
const OUTPUT_FILE: &str = "output";

/// Requirement name reported when the interpreter is missing.
pub const RUBY_REQUIREMENT: &str = "ruby";

#[derive(Serialize)]
struct EvaluatorRequest<'a> {
    spec: &'a Value,
    template: &'a str,
    template_path: &'a Path,
    output: &'a Path,
}

/// Subprocess engine evaluating ERB with `Bosh::Template::EvaluationContext`.
#[derive(Debug, Clone)]
pub struct ErbEngine {
    ruby: PathBuf,
    gem: PathBuf,
    gem_name: String,
    timeout: Option<Duration>,
    workspace_root: Option<PathBuf>,
}

impl ErbEngine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ruby: config.ruby.clone(),
            gem: config.gem.clone(),
            gem_name: config.gem_name.clone(),
            timeout: config.timeout,
            workspace_root: config.workspace_root.clone(),
        }
    }

    fn availability_key(&self) -> AvailabilityKey {
        AvailabilityKey {
            ruby: self.ruby.clone(),
            gem: self.gem.clone(),
            gem_name: self.gem_name.clone(),
        }
    }

    /// Find the interpreter and confirm the gem, returning the interpreter path.
    async fn resolve_ruby(&self) -> Result<PathBuf> {
        let key = self.availability_key();
        if let Some(ruby) = availability::cached(&key) {
            return Ok(ruby);
        }

        let unavailable = |reason: String| RenderError::EnvironmentUnavailable {
            requirement: RUBY_REQUIREMENT.to_string(),
            message: "rendering BOSH templates requires ruby, please install ruby and make sure it's in your PATH"
                .to_string(),
            reason,
        };

        // PATH scanning touches the filesystem
        let lookup = self.ruby.clone();
        let ruby = tokio::task::spawn_blocking(move || which::which(lookup))
            .await
            .map_err(|e| unavailable(format!("{}: {e}", self.ruby.display())))?
            .map_err(|e| unavailable(format!("{}: {e}", self.ruby.display())))?;
        tracing::debug!("Using ruby interpreter at {}", ruby.display());

        self.check_gem().await?;

        availability::remember(key, &ruby);
        Ok(ruby)
    }

    async fn check_gem(&self) -> Result<()> {
        let missing = |reason: String| RenderError::EnvironmentUnavailable {
            requirement: self.gem_name.clone(),
            message: format!(
                "rendering BOSH templates requires the {} ruby gem, please install it",
                self.gem_name
            ),
            reason,
        };

        let output = Command::new(&self.gem)
            .args(["list", "-i", &self.gem_name])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| missing(format!("could not run {}: {e}", self.gem.display())))?;

        if output.status.success() {
            tracing::debug!("Gem {} is installed", self.gem_name);
            Ok(())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let reason = match stdout.trim() {
                "" => format!("'{} list -i {}' exited with {}", self.gem.display(), self.gem_name, output.status),
                text => text.to_string(),
            };
            Err(missing(reason))
        }
    }

    /// Run the evaluator inside `workspace`.
    async fn expand_in(&self, ruby: &Path, workspace: &Path, request: ExpansionRequest<'_>) -> Result<Vec<u8>> {
        let evaluator = workspace.join(EVALUATOR_FILE);
        let request_file = workspace.join(REQUEST_FILE);
        let output_file = workspace.join(OUTPUT_FILE);

        tokio::fs::write(&evaluator, EVALUATOR).await.with_file_op(FileOperation::Write, &evaluator)?;

        let body = serde_json::to_vec(&EvaluatorRequest {
            spec: request.spec,
            template: request.template,
            template_path: request.template_path,
            output: &output_file,
        })?;
        tokio::fs::write(&request_file, body).await.with_file_op(FileOperation::Write, &request_file)?;

        let mut cmd = Command::new(ruby);
        cmd.arg(&evaluator)
            .arg(&request_file)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            "Evaluating {} with {} in {}",
            request.template_path.display(),
            ruby.display(),
            workspace.display()
        );
        let start = Instant::now();
        let output_future = cmd.output();

        // Dropping the future on timeout kills the child
        let output = match self.timeout {
            Some(limit) => match timeout(limit, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        "Rendering {} timed out after {:.1}s",
                        request.template_path.display(),
                        limit.as_secs_f64()
                    );
                    return Err(RenderError::Timeout {
                        template: request.template_path.to_path_buf(),
                        after: limit,
                    });
                }
            },
            None => output_future.await,
        }
        .with_file_op(FileOperation::Spawn, ruby)?;

        tracing::debug!(
            "Evaluator for {} finished in {:.2}s ({})",
            request.template_path.display(),
            start.elapsed().as_secs_f64(),
            output.status
        );

        if !output.status.success() {
            let mut diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostic.push_str(&String::from_utf8_lossy(&output.stderr));
            if diagnostic.is_empty() {
                diagnostic = format!("evaluator exited with {}", output.status);
            }
            return Err(RenderError::TemplateExpansion {
                template: request.template_path.to_path_buf(),
                line: extract_erb_line(&diagnostic),
                diagnostic,
            });
        }

        tokio::fs::read(&output_file).await.with_file_op(FileOperation::Read, &output_file)
    }
}

impl ExpansionEngine for ErbEngine {
    fn name(&self) -> &'static str {
        "erb"
    }

    async fn check_available(&self) -> Result<()> {
        self.resolve_ruby().await.map(|_| ())
    }

    async fn expand(&self, request: ExpansionRequest<'_>) -> Result<Vec<u8>> {
        let ruby = self.resolve_ruby().await?;

        let root = self.workspace_root.clone().unwrap_or_else(std::env::temp_dir);
        let workspace = tempfile::Builder::new()
            .prefix("bosh-render-")
            .tempdir_in(&root)
            .with_file_op(FileOperation::CreateWorkspace, &root)?;
        let workspace_path = workspace.path().to_path_buf();

        let result = self.expand_in(&ruby, &workspace_path, request).await;

        match workspace.close() {
            Ok(()) => result,
            Err(source) => {
                tracing::warn!("Failed to remove workspace {}: {}", workspace_path.display(), source);
                Err(RenderError::Cleanup {
                    path: workspace_path,
                    source,
                    primary: result.err().map(Box::new),
                })
            }
        }
    }
}

/// Template line named by a Ruby ERB backtrace (`(erb):12: ...`).
pub fn extract_erb_line(diagnostic: &str) -> Option<usize> {
    let re = Regex::new(r"\(erb\):(\d+)").ok()?;
    re.captures(diagnostic)?.get(1)?.as_str().parse().ok()
}
