//! Directive grammar.
//!
//! A directive is an HTML comment that fills a whole (trimmed) line:
//!
//! ```text
//! <!-- copy NAME -->         <!-- cut NAME -->        <!-- template NAME -->
//! <!-- paste NAME -->        <!-- end -->
//! <!-- set NAME [VALUE] -->  <!-- global NAME [VALUE] -->
//! <!-- if [!]COND -->        <!-- endif -->
//! <!-- include PATH -->      <!-- index GLOB TEMPLATE [SORT] -->
//! ```
//!
//! Only the leading comment counts: text after it is ignored, so
//! `<!-- paste nav --> <br>` is still a paste. The one exception is a block
//! opener closed on the same line, `<!-- copy NAME -->BODY<!-- end -->`,
//! whose body is available through [`Directive::inline_body`].
//!
//! Anything that does not fit, including directives with a missing or
//! malformed name, is plain text. Parsing never fails.

use regex::Regex;
use std::sync::LazyLock;

/// Leading `<!-- content -->` of a trimmed line.
static LEADING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!--\s+(.*?)\s+-->").unwrap());

/// `BODY<!-- end -->` closing a one-line block.
static INLINE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)<!--\s+end\s+-->\s*$").unwrap());

/// Value assigned by `set` and `global` when none is given.
pub const DEFAULT_VALUE: &str = "true";

// ============================================================================
// Types
// ============================================================================

/// A recognized directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Copy(String),
    Cut(String),
    Template(String),
    /// Closes the most recently opened copy/cut/template block.
    End,
    Paste(String),
    Set { name: String, value: String },
    Global { name: String, value: String },
    If(Condition),
    Endif,
    Include(String),
    Index(IndexSpec),
}

/// Kind of block opened by `copy`, `cut` or `template`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Copy,
    Cut,
    Template,
}

/// Condition of an `if` directive or inline conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub name: String,
    pub negated: bool,
}

/// Arguments of an `index` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub pattern: String,
    pub template: String,
    pub sort: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

impl Directive {
    /// Classify a single line. Returns `None` for plain text.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LEADING_COMMENT.captures(line.trim())?;
        let body = caps.get(1)?.as_str();

        let mut tokens = body.split_whitespace();
        let command = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        match command {
            "copy" => named(&args).map(Self::Copy),
            "cut" => named(&args).map(Self::Cut),
            "template" => named(&args).map(Self::Template),
            "paste" => named(&args).map(Self::Paste),
            "set" => assignment(&args).map(|(name, value)| Self::Set { name, value }),
            "global" => assignment(&args).map(|(name, value)| Self::Global { name, value }),
            "if" => Condition::parse(&args.join(" ")).map(Self::If),
            "endif" => Some(Self::Endif),
            "end" => Some(Self::End),
            "include" if !args.is_empty() => Some(Self::Include(args.join(" "))),
            "index" => IndexSpec::from_args(&args).map(Self::Index),
            _ => None,
        }
    }

    /// The block this directive opens, if it is a copy/cut/template marker.
    pub fn opens_block(&self) -> Option<(BlockKind, &str)> {
        match self {
            Self::Copy(name) => Some((BlockKind::Copy, name)),
            Self::Cut(name) => Some((BlockKind::Cut, name)),
            Self::Template(name) => Some((BlockKind::Template, name)),
            _ => None,
        }
    }

    /// Body of a block opened and closed on one line, e.g. `Bye` for
    /// `<!-- copy footer -->Bye<!-- end -->`.
    pub fn inline_body(line: &str) -> Option<&str> {
        let line = line.trim();
        if !Self::parse(line).is_some_and(|d| d.opens_block().is_some()) {
            return None;
        }
        let opener = LEADING_COMMENT.find(line)?;
        INLINE_END
            .captures(&line[opener.end()..])
            .and_then(|caps| caps.get(1))
            .map(|body| body.as_str())
    }

    /// Block structure markers: `copy`, `cut`, `template` and `end`.
    pub const fn is_block_marker(&self) -> bool {
        matches!(
            self,
            Self::Copy(_) | Self::Cut(_) | Self::Template(_) | Self::End
        )
    }
}

impl Condition {
    /// Parse `name` or `!name`. Whitespace after `!` is allowed.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negated, name) = match text.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, text),
        };
        (!name.is_empty()).then(|| Self {
            name: name.to_owned(),
            negated,
        })
    }
}

impl IndexSpec {
    fn from_args(args: &[&str]) -> Option<Self> {
        match *args {
            [pattern, template] => Some(Self {
                pattern: pattern.to_owned(),
                template: template.to_owned(),
                sort: None,
            }),
            [pattern, template, sort] => Some(Self {
                pattern: pattern.to_owned(),
                template: template.to_owned(),
                sort: Some(sort.to_owned()),
            }),
            _ => None,
        }
    }
}

/// Check a snippet, template or variable name against `[A-Za-z0-9_.-]+`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn named(args: &[&str]) -> Option<String> {
    args.first()
        .filter(|name| is_valid_name(name))
        .map(|name| (*name).to_owned())
}

fn assignment(args: &[&str]) -> Option<(String, String)> {
    let name = named(args)?;
    let value = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        DEFAULT_VALUE.to_owned()
    };
    Some((name, value))
}

// ============================================================================
// Tests
// ============================================================================
