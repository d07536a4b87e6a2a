//! EMQX exhook bridge configuration tool
//!
//! Resolves the bridge configuration the same way the service does at
//! startup and prints or checks it.

use anyhow::{Context, Result};
use clap::Parser;
use emqx_exhook::cli::{Cli, Command};
use emqx_exhook::config::{self, ConfigLoader, SearchPaths, register_defaults};
use emqx_exhook::format::{OutputFormat, render};
use emqx_exhook::logging::{self, LogTarget};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    match cli.command.unwrap_or_default() {
        Command::Show { format } => {
            let loader = load(cli.config.as_deref())?;
            let config = config::global::install(loader.into_config())?;
            print!("{}", render(config.as_ref(), format)?);
        }
        Command::Check => {
            let loader = load(cli.config.as_deref())?;
            let source = loader
                .config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            let config = loader.config();
            // load() validated the config, so the backend is known
            if let Some(broker) = config.broker() {
                println!(
                    "ok: {} (mqType: {}, endpoints: {}, destination: {})",
                    source,
                    config.mq_type,
                    broker.endpoints().join(", "),
                    broker.destination()
                );
            }
        }
        Command::Defaults { format } => {
            print!("{}", render(register_defaults().as_value(), format)?);
        }
        Command::Paths => {
            let paths = SearchPaths::standard();
            let found = paths.find_config();
            for dir in paths.dirs() {
                let file = dir
                    .path
                    .join(format!("{}.{}", config::CONFIG_BASE_NAME, config::CONFIG_EXTENSION));
                let marker = if found.as_ref() == Some(&file) { "*" } else { " " };
                println!("{} {:<12} {}", marker, dir.location, dir.path.display());
            }
        }
    }

    Ok(())
}

/// Resolve the configuration from an explicit file or the search path, and
/// log the result.
fn load(explicit: Option<&Path>) -> Result<ConfigLoader> {
    let loader = match explicit {
        Some(path) => ConfigLoader::load_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ConfigLoader::load().context("Failed to resolve configuration")?,
    };

    match loader.config_path() {
        Some(path) => info!(path = %path.display(), "Configuration resolved"),
        None => info!("Configuration resolved from defaults"),
    }
    info!("app config:\n{}", render(loader.config(), OutputFormat::Yaml)?);

    Ok(loader)
}
