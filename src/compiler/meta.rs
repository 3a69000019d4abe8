//! Source file records, frontmatter and file routing.
//!
//! Every processed source file becomes a [`FileRecord`] at load time. The
//! record owns the file's lines and metadata and is mutated in place by each
//! pipeline stage until it is written.
//!
//! # Routing
//!
//! | Extension                    | Handling                                 |
//! |------------------------------|------------------------------------------|
//! | `.md` `.mdown` `.markdown`   | markdown → HTML, written as `.html`      |
//! | `.html` `.htm` `.txt`        | directives only                          |
//! | anything else                | copied byte-for-byte                     |

use super::markdown;
use anyhow::{Context, Result};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::{Path, PathBuf},
};

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdown", "markdown"];
pub const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "txt"];

/// Frontmatter delimiter line.
const FENCE: &str = "---";

// ============================================================================
// Routing
// ============================================================================

/// How a source file is handled by the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Markdown,
    Markup,
    Asset,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            Self::Markdown
        } else if MARKUP_EXTENSIONS.contains(&ext.as_str()) {
            Self::Markup
        } else {
            Self::Asset
        }
    }

    pub const fn is_page(self) -> bool {
        !matches!(self, Self::Asset)
    }
}

/// Output path for a source path: markdown extensions become `.html`.
pub fn output_path(rel: &Path) -> PathBuf {
    match SourceKind::of(rel) {
        SourceKind::Markdown => rel.with_extension("html"),
        _ => rel.to_path_buf(),
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// A frontmatter value, typed for sorting and stringified for interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    Number { raw: String, value: f64 },
    Bool(bool),
}

/// Frontmatter metadata of one file.
pub type Metadata = BTreeMap<String, MetaValue>;

impl MetaValue {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Self::Number {
                    raw: raw.to_owned(),
                    value,
                },
                _ => Self::Text(raw.to_owned()),
            },
        }
    }

    /// Value as written in the frontmatter.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Number { raw, .. } => raw,
            Self::Bool(true) => "true",
            Self::Bool(false) => "false",
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Split leading frontmatter off `text`.
///
/// The first line must be exactly `---` and a later line must close the block
/// with `---`. Without a closing fence the whole text is content.
pub fn split_frontmatter(text: &str) -> (Metadata, &str) {
    let mut meta = Metadata::new();
    let mut offset = 0;
    let mut opened = false;

    for line in text.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end_matches(['\n', '\r']);

        if !opened {
            if trimmed != FENCE {
                return (Metadata::new(), text);
            }
            opened = true;
            continue;
        }

        if trimmed == FENCE {
            return (meta, &text[offset..]);
        }

        if let Some((key, value)) = parse_pair(trimmed) {
            meta.insert(key, value);
        }
    }

    (Metadata::new(), text)
}

fn parse_pair(line: &str) -> Option<(String, MetaValue)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_owned(), MetaValue::parse(strip_quotes(value.trim()))))
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

// ============================================================================
// File Record
// ============================================================================

/// Split text into lines on `\n`, so that joining with `\n` restores it.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

/// A processed source file moving through the pipeline.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute source path
    pub source: PathBuf,
    /// Output path relative to the output directory
    pub relative: PathBuf,
    pub lines: Vec<String>,
    pub meta: Metadata,
    /// Snippet names consumed by `paste`
    pub used_snippets: BTreeSet<String>,
}

impl FileRecord {
    /// Read a page from disk, strip frontmatter and render markdown.
    pub fn load(source: &Path, root: &Path) -> Result<Self> {
        let text = fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source.display()))?;
        let rel = source.strip_prefix(root).unwrap_or(source);
        Ok(Self::from_text(source, rel, &text))
    }

    /// Build a record from already-read text. `rel` is the source path
    /// relative to the source root.
    pub fn from_text(source: &Path, rel: &Path, text: &str) -> Self {
        let (meta, body) = split_frontmatter(text);
        let body = match SourceKind::of(rel) {
            SourceKind::Markdown => markdown::render(body),
            _ => body.to_owned(),
        };

        Self {
            source: source.to_path_buf(),
            relative: output_path(rel),
            lines: split_lines(&body),
            meta,
            used_snippets: BTreeSet::new(),
        }
    }

    /// Relative output path for log messages.
    pub fn display_name(&self) -> String {
        self.relative.display().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
