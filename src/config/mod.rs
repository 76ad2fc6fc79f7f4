//! Renderer configuration.
//!
//! Settings live in a TOML file. The CLI looks for it, in order, at:
//!
//! 1. the `--config` flag
//! 2. the `BOSH_RENDER_CONFIG` environment variable
//! 3. `~/.bosh-render/config.toml` (`%LOCALAPPDATA%\bosh-render\config.toml` on Windows)
//!
//! A missing file at the default location means defaults; a missing file named
//! explicitly is an error. Command-line flags override file values.
//!
//! ```toml
//! engine = "erb"
//! ruby = "/opt/ruby/bin/ruby"
//! gem = "/opt/ruby/bin/gem"
//! gem_name = "bosh-template"
//! timeout_secs = 120
//! max_parallel = 8
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::engine::{DEFAULT_GEM, DEFAULT_GEM_NAME, DEFAULT_RUBY, DEFAULT_TIMEOUT, EngineConfig, EngineKind};
use crate::job::DEFAULT_MAX_PARALLEL;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BOSH_RENDER_CONFIG";

/// Renderer settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Expansion engine
    pub engine: EngineKind,
    /// Ruby interpreter name or absolute path
    pub ruby: PathBuf,
    /// `gem` command name or absolute path
    pub gem: PathBuf,
    /// Gem required by the ERB engine
    pub gem_name: String,
    /// Per-template engine timeout in seconds; `0` disables the limit
    pub timeout_secs: u64,
    /// Templates rendered at once by `job`
    pub max_parallel: usize,
    /// Where engine workspaces are created (system temp dir if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            ruby: PathBuf::from(DEFAULT_RUBY),
            gem: PathBuf::from(DEFAULT_GEM),
            gem_name: DEFAULT_GEM_NAME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            workspace_dir: None,
        }
    }
}

impl RendererConfig {
    /// Load from an explicit path, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path does not exist, or if the file
    /// cannot be read or parsed.
    pub async fn load_with_optional(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path).await;
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path).await,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Platform default config location, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()?.join("bosh-render")
        } else {
            dirs::home_dir()?.join(".bosh-render")
        };
        Some(dir.join("config.toml"))
    }

    /// Engine timeout, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            kind: self.engine,
            ruby: self.ruby.clone(),
            gem: self.gem.clone(),
            gem_name: self.gem_name.clone(),
            timeout: self.timeout(),
            workspace_root: self.workspace_dir.clone(),
        }
    }

    /// Serialize as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
