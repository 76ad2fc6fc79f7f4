//! Render driver: one template, one context, one output file.
//!
//! [`RenderDriver::render`] runs the full sequence for a single template:
//!
//! 1. Check that the engine is available (before anything touches the disk)
//! 2. Read the template body and its permission bits
//! 3. Expand it against the context's engine spec
//! 4. Atomically write the output, creating parent directories
//!
//! The output is the engine's bytes, unmodified. Its permission bits are those
//! of the source template, except that anything rendered into a directory named
//! `bin` gets `0755`.
//!
//! # Example
//!
//! ```rust,no_run
//! use bosh_render_cli::context::RenderInputs;
//! use bosh_render_cli::engine::{EngineConfig, EngineKind};
//! use bosh_render_cli::links::LinkResolver;
//! use bosh_render_cli::properties::PropertySchema;
//! use bosh_render_cli::render::RenderDriver;
//! use serde_json::json;
//! use std::path::Path;
//!
//! # async fn example() -> bosh_render_cli::core::Result<()> {
//! let schema = PropertySchema::from_defaults([("foo", Some(json!("baz")))]);
//! let context = RenderInputs::default().assemble(&schema, &LinkResolver::new())?;
//!
//! let driver = RenderDriver::from_config(&EngineConfig {
//!     kind: EngineKind::Tera,
//!     ..EngineConfig::default()
//! });
//! let output = driver
//!     .render(&context, Path::new("templates/config.tera"), Path::new("out/config/app.conf"))
//!     .await?;
//! println!("wrote {} bytes", output.bytes);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::context::EvaluationContext;
use crate::core::{FileOperation, IoResultExt, Result};
use crate::engine::{Engine, EngineConfig, ExpansionEngine, ExpansionRequest};
use crate::utils::fs::{atomic_write, file_mode};

/// Permission bits for anything rendered into a `bin` directory.
pub const BIN_MODE: u32 = 0o755;

/// Directory name that forces [`BIN_MODE`].
pub const BIN_DIR: &str = "bin";

/// What a successful render produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub template: PathBuf,
    pub destination: PathBuf,
    /// Number of bytes written
    pub bytes: usize,
    /// Permission bits applied to the destination (`None` without Unix modes)
    pub mode: Option<u32>,
}

/// Renders templates with one engine.
#[derive(Debug, Clone)]
pub struct RenderDriver<E = Engine> {
    engine: E,
}

impl RenderDriver<Engine> {
    /// Driver for the engine selected by `config`.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Engine::from_config(config))
    }
}

impl<E: ExpansionEngine> RenderDriver<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
        }
    }

    /// Check engine availability without rendering anything.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::RenderError::EnvironmentUnavailable`] naming what is missing.
    pub async fn check(&self) -> Result<()> {
        self.engine.check_available().await
    }

    /// Render `template` against `context` into `destination`.
    ///
    /// # Errors
    ///
    /// - [`crate::core::RenderError::EnvironmentUnavailable`] before any file is touched
    /// - [`crate::core::RenderError::Io`] when the template cannot be read or the
    ///   output cannot be written
    /// - [`crate::core::RenderError::TemplateExpansion`] when the engine fails, with
    ///   its diagnostic verbatim
    /// - [`crate::core::RenderError::Timeout`] when the engine runs too long
    ///
    /// On any error the destination is left as it was.
    pub async fn render(
        &self,
        context: &EvaluationContext,
        template: &Path,
        destination: &Path,
    ) -> Result<RenderedOutput> {
        self.engine.check_available().await?;

        let start = Instant::now();
        let body = read_template(template).await?;
        let source_mode = file_mode(template)?;
        let spec = context.to_engine_spec()?;

        tracing::debug!(
            "Rendering {} -> {} for job '{}' with {}",
            template.display(),
            destination.display(),
            context.job_name().unwrap_or("-"),
            self.engine.name()
        );
        let output = self
            .engine
            .expand(ExpansionRequest {
                template_path: template,
                template: &body,
                spec: &spec,
            })
            .await?;

        let mode = output_mode(source_mode, destination);
        let bytes = output.len();
        let target = destination.to_path_buf();
        tokio::task::spawn_blocking(move || atomic_write(&target, &output, mode))
            .await
            .map_err(std::io::Error::other)
            .with_file_op(FileOperation::Write, destination)??;

        tracing::info!(
            "Rendered {} ({} bytes) in {:.2}s",
            destination.display(),
            bytes,
            start.elapsed().as_secs_f64()
        );
        Ok(RenderedOutput {
            template: template.to_path_buf(),
            destination: destination.to_path_buf(),
            bytes,
            mode,
        })
    }
}

async fn read_template(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await.with_file_op(FileOperation::Read, path)?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        .with_file_op(FileOperation::Read, path)
}

/// Permission bits for a rendered file.
///
/// `0755` when the destination's parent directory is named `bin`, otherwise
/// the source template's bits.
#[must_use]
pub fn output_mode(source_mode: Option<u32>, destination: &Path) -> Option<u32> {
    let in_bin = destination
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == BIN_DIR);
    if in_bin && cfg!(unix) {
        Some(BIN_MODE)
    } else {
        source_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderInputs;
    use crate::core::{ErrorKind, RenderError};
    use crate::engine::{EngineKind, TeraEngine};
    use crate::links::LinkResolver;
    use crate::properties::PropertySchema;
    use serde_json::json;
    use tempfile::TempDir;

    fn context(values: serde_json::Value) -> EvaluationContext {
        let inputs = RenderInputs {
            properties: values,
            ..RenderInputs::default()
        };
        let schema = PropertySchema::from_defaults([("foo", Some(json!("baz")))]);
        inputs.assemble(&schema, &LinkResolver::new()).unwrap()
    }

    #[test]
    fn test_output_mode() {
        assert_eq!(output_mode(Some(0o644), Path::new("out/config/app.conf")), Some(0o644));
        assert_eq!(output_mode(None, Path::new("app.conf")), None);
        if cfg!(unix) {
            assert_eq!(output_mode(Some(0o644), Path::new("out/bin/ctl")), Some(0o755));
            assert_eq!(output_mode(Some(0o600), Path::new("bin/ctl")), Some(0o755));
        }
        assert_eq!(output_mode(Some(0o644), Path::new("out/bin")), Some(0o644));
        assert_eq!(output_mode(Some(0o644), Path::new("out/binaries/ctl")), Some(0o644));
    }

    #[tokio::test]
    async fn test_render_default_and_supplied() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("test.tera");
        std::fs::write(&template, "{{ p(name=\"foo\") }}\n").unwrap();
        let driver = RenderDriver::new(TeraEngine::new());

        let dest = temp.path().join("out/default.txt");
        driver.render(&context(json!({})), &template, &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "baz\n");

        let dest = temp.path().join("out/supplied.txt");
        let output = driver.render(&context(json!({ "foo": "bar" })), &template, &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "bar\n");
        assert_eq!(output.bytes, 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let template = temp.path().join("ctl.tera");
        std::fs::write(&template, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&template, std::fs::Permissions::from_mode(0o640)).unwrap();
        let driver = RenderDriver::from_config(&EngineConfig {
            kind: EngineKind::Tera,
            ..EngineConfig::default()
        });

        let dest = temp.path().join("job/bin/ctl");
        let output = driver.render(&context(json!({})), &template, &dest).await.unwrap();
        assert_eq!(output.mode, Some(0o755));
        assert_eq!(std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o755);

        let dest = temp.path().join("job/config/ctl.conf");
        driver.render(&context(json!({})), &template, &dest).await.unwrap();
        assert_eq!(std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[tokio::test]
    async fn test_missing_template_is_io_error() {
        let temp = TempDir::new().unwrap();
        let driver = RenderDriver::new(TeraEngine::new());
        let dest = temp.path().join("out.txt");

        let err = driver
            .render(&context(json!({})), &temp.path().join("nope.tera"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Io { operation: FileOperation::Read, .. }), "{err}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_failed_expansion_leaves_destination_untouched() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("bad.tera");
        std::fs::write(&template, "{{ p(name=\"thisdoesntexist\") }}\n").unwrap();
        let dest = temp.path().join("out.txt");
        std::fs::write(&dest, "previous").unwrap();

        let err = RenderDriver::new(TeraEngine::new())
            .render(&context(json!({})), &template, &dest)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TemplateExpansion);
        assert!(err.to_string().contains("thisdoesntexist"));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("test.tera");
        std::fs::write(&template, "{{ p(name=\"foo\") }}\n").unwrap();

        // A directory where the output file should go makes the final rename fail
        let out = temp.path().join("out");
        let dest = out.join("app.conf");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("keep"), "previous").unwrap();

        let err = RenderDriver::new(TeraEngine::new())
            .render(&context(json!({})), &template, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Io { operation: FileOperation::Persist, .. }), "{err}");
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("app.conf")]);
        assert!(dest.is_dir());
        assert_eq!(std::fs::read_to_string(dest.join("keep")).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_unavailable_engine_fails_before_reading() {
        let temp = TempDir::new().unwrap();
        let workspaces = temp.path().join("workspaces");
        std::fs::create_dir(&workspaces).unwrap();
        let driver = RenderDriver::from_config(&EngineConfig {
            kind: EngineKind::Erb,
            ruby: temp.path().join("no-such-ruby"),
            workspace_root: Some(workspaces.clone()),
            ..EngineConfig::default()
        });

        // The template does not exist either; availability must be reported first
        let err = driver
            .render(&context(json!({})), &temp.path().join("missing.erb"), &temp.path().join("out"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EnvironmentUnavailable);
        assert_eq!(std::fs::read_dir(&workspaces).unwrap().count(), 0);
        assert!(!temp.path().join("out").exists());
    }
}
