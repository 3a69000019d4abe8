//! Per-build shared state.

use rustc_hash::FxHashMap;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Named blocks of lines (snippets or templates).
pub type Table = FxHashMap<String, Vec<String>>;

/// String variables, ordered by name.
pub type Vars = BTreeMap<String, String>;

/// Tables shared by every file of one build.
///
/// Filled by the collector, then only read while files are transformed.
/// A fresh session is created for every build and dropped afterwards.
#[derive(Debug, Default)]
pub struct BuildSession {
    /// Source root; `include` and `index` paths resolve against it.
    pub root: PathBuf,
    pub snippets: Table,
    pub templates: Table,
    pub globals: Vars,
}

impl BuildSession {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }
}
