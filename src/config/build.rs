//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in sniplicity.toml - source and output locations.
///
/// # Example
/// ```toml
/// [build]
/// input = "src"       # Source tree
/// output = "public"   # Compiled site
/// clean = true        # Remove output before each build
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Source directory.
    #[serde(default = "defaults::build::input")]
    #[educe(Default = defaults::build::input())]
    pub input: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Clear output directory before each build.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Print per-file progress and duplicate definitions.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub verbose: bool,
}
