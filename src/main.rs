//! sniplicity - compile comment directives into a static site.

mod build;
mod cli;
mod compiler;
mod config;
mod logger;
mod serve;
mod utils;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use serve::serve_site;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));
    logger::set_verbose(config.build.verbose);
    if config.config_path.is_file() {
        debug!("config"; "loaded {}", config.config_path.display());
    }

    match &cli.command {
        Commands::Build { .. } => build_site(config).map(|_| ()),
        Commands::Watch { .. } => {
            build_site(config)?;
            watch_for_changes_blocking(config)
        }
        Commands::Serve { .. } => {
            build_site(config)?;
            serve_site(config)
        }
    }
}

/// Load and validate configuration from CLI arguments.
///
/// A missing config file is fine; defaults apply.
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.clone().unwrap_or_else(|| "./".into());
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
