//! CLI structure and command dispatch.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use santa_core::config::{Config, Settings};
use santa_types::{LogFormat, LogLevel};
use std::path::PathBuf;

use crate::commands;

#[derive(Parser)]
#[command(name = "santa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate secrets and render them through templates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SANTA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true, env = "SANTA_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Settings file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate secrets and render the request template
    Render {
        /// Request file with `template` and `generators`
        #[arg(short, long)]
        file: PathBuf,

        /// Print a masked preview instead of the real output
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Check a request without generating anything
    Validate {
        /// Request file with `template` and `generators`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registered generator types
    Types {
        /// Also show the output fields of each type
        #[arg(short, long)]
        keys: bool,
    },
}

impl Cli {
    /// Resolve settings, start logging, and run the selected command.
    pub fn execute(&self) -> Result<()> {
        let settings = self.settings()?;
        santa_core::log::init(&settings.log)?;
        tracing::debug!(
            version = santa_core::VERSION,
            config = ?self.config,
            "starting {}",
            santa_core::APP_NAME
        );

        match &self.command {
            Commands::Render { file, dry_run } => commands::render::run(file, *dry_run, settings),
            Commands::Validate { file } => commands::validate::run(file, settings),
            Commands::Types { keys } => commands::types::run(*keys),
        }
    }

    /// Settings from file and environment, with command-line flags on top.
    fn settings(&self) -> Result<Settings> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Config::new(),
        };
        config.load_env();

        let mut settings = Settings::from_config(&config)?;
        if let Some(level) = &self.log_level {
            settings.log.level = level.parse::<LogLevel>()?;
        }
        if let Some(format) = &self.log_format {
            settings.log.format = format.parse::<LogFormat>()?;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = Cli::try_parse_from(["santa", "--log-level", "debug", "render", "-f", "req.yaml", "--dry-run"])
            .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Commands::Render { ref file, dry_run: true } if file == &PathBuf::from("req.yaml")
        ));
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from(["santa", "--log-format", "json", "--log-level", "warn", "types"]).unwrap();
        let settings = cli.settings().unwrap();
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.log.level, LogLevel::Warn);

        let cli = Cli::try_parse_from(["santa", "--log-level", "loud", "types"]).unwrap();
        assert!(cli.settings().is_err());
    }
}
