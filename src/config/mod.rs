//! Project configuration from `sniplicity.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                      |
//! |-------------|----------------------------------------------|
//! | `[build]`   | Source/output directories, clean, verbose    |
//! | `[serve]`   | Preview server (interface, port, watch)      |
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "src"
//! output = "public"
//!
//! [serve]
//! port = 3000
//! ```
//!
//! The file is optional; without it every field takes its default.

mod build;
pub mod defaults;
mod error;
mod serve;

use build::BuildConfig;
use error::ConfigError;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing sniplicity.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let config: SiteConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Update configuration with CLI arguments and resolve all paths
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.input, cli.input.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        self.build.verbose |= cli.verbose;

        match &cli.command {
            Commands::Build { build_args } | Commands::Watch { build_args } => {
                self.build.clean |= build_args.clean;
            }
            Commands::Serve {
                build_args,
                interface,
                port,
                watch,
            } => {
                self.build.clean |= build_args.clean;
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
        }

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against the root and normalize them to absolute paths
    fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = Self::normalize_path(&expand_tilde(root));
        self.build.root = Some(root.clone());

        self.config_path = Self::normalize_path(&root.join(config_name));
        self.build.input = Self::normalize_path(&root.join(expand_tilde(&self.build.input)));
        self.build.output = Self::normalize_path(&root.join(expand_tilde(&self.build.output)));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate the resolved directories
    pub fn validate(&self) -> Result<()> {
        let input = &self.build.input;
        let output = &self.build.output;

        if !input.exists() {
            bail!(ConfigError::Validation(format!(
                "[build.input] `{}` not found",
                input.display()
            )));
        }
        if !input.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.input] `{}` is not a directory",
                input.display()
            )));
        }
        if input == output {
            bail!(ConfigError::Validation(
                "[build.output] must differ from [build.input]".into()
            ));
        }
        if input.starts_with(output) {
            bail!(ConfigError::Validation(
                "[build.input] must not be inside [build.output]".into()
            ));
        }

        Ok(())
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// Tests
// ============================================================================
