//! Check engine availability.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

use super::common::EngineArgs;
use crate::config::RendererConfig;
use crate::engine::{Engine, ExpansionEngine};

/// Verify that the configured engine can render templates.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Also print the effective configuration
    #[arg(long)]
    show_config: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

impl CheckCommand {
    pub async fn execute(self, settings: &RendererConfig, config_path: Option<&Path>) -> Result<()> {
        let settings = self.engine.apply(settings);

        if self.show_config {
            match config_path.map(Path::to_path_buf).or_else(RendererConfig::default_path) {
                Some(path) => println!("# {}", path.display()),
                None => println!("# defaults"),
            }
            println!("{}", settings.to_toml()?);
        }

        let engine = Engine::from_config(&settings.engine_config());
        engine.check_available().await?;

        println!("{} {} engine is available", "✓".green(), engine.name());
        Ok(())
    }
}
