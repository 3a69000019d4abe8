//! Variables, conditionals and `{{token}}` substitution.
//!
//! Resolution runs in three steps over a file's text:
//!
//! 1. inline conditionals: `<!-- if x -->shown<!-- endif -->` on one line
//! 2. block sweep: `if`/`endif` lines toggle output, directive lines are dropped
//! 3. token substitution: `{{name}}` → value
//!
//! Lookups go through a [`Scope`]: `set` locals, then frontmatter, then globals.

use super::{
    directive::{Condition, Directive},
    meta::Metadata,
    session::Vars,
};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static INLINE_IF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*if\s+([^>]+?)\s*-->(.*?)<!--\s*endif\s*-->").unwrap()
});

pub(super) static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_.-]+)\}\}").unwrap());

// ============================================================================
// Scope
// ============================================================================

/// Layered variable lookup for one file.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub locals: &'a Vars,
    pub meta: &'a Metadata,
    pub globals: &'a Vars,
}

impl<'a> Scope<'a> {
    pub const fn new(locals: &'a Vars, meta: &'a Metadata, globals: &'a Vars) -> Self {
        Self {
            locals,
            meta,
            globals,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.locals
            .get(name)
            .map(String::as_str)
            .or_else(|| self.meta.get(name).map(|value| value.as_str()))
            .or_else(|| self.globals.get(name).map(String::as_str))
    }

    pub fn test(&self, condition: &Condition) -> bool {
        is_truthy(self.get(&condition.name)) != condition.negated
    }
}

/// Defined, non-empty, and neither `false` nor `0`.
pub fn is_truthy(value: Option<&str>) -> bool {
    !matches!(value, None | Some("" | "false" | "0"))
}

/// Variables assigned by `set` anywhere in `lines`. Last assignment wins.
pub fn collect_locals<S: AsRef<str>>(lines: &[S]) -> Vars {
    lines
        .iter()
        .filter_map(|line| match Directive::parse(line.as_ref()) {
            Some(Directive::Set { name, value }) => Some((name, value)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Resolution
// ============================================================================

/// What to do with a `{{token}}` that has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    Remove,
    Keep,
}

/// Run all three resolution steps.
pub fn resolve(text: &str, scope: &Scope<'_>, unresolved: Unresolved) -> String {
    let text = resolve_inline_conditionals(text, scope);
    let text = sweep_blocks(&text, scope);
    substitute(&text, scope, unresolved)
}

/// Replace the first inline conditional until none is left.
///
/// Each replacement removes at least the closing `<!-- endif -->`, so the
/// loop ends. Conditionals do not nest: an inner opener is kept as text.
pub fn resolve_inline_conditionals(text: &str, scope: &Scope<'_>) -> String {
    let mut text = text.to_owned();
    loop {
        let Some((range, replacement)) = INLINE_IF.captures(&text).map(|caps| {
            let shown = Condition::parse(&caps[1]).is_some_and(|cond| scope.test(&cond));
            let replacement = if shown { caps[2].to_owned() } else { String::new() };
            (caps.get(0).map_or(0..0, |m| m.range()), replacement)
        }) else {
            break;
        };
        text.replace_range(range, &replacement);
    }
    text
}

/// Apply block conditionals and drop every directive line.
///
/// A leftover `cut` marker suppresses output until the next `end`, unless it
/// closes on its own line.
pub fn sweep_blocks(text: &str, scope: &Scope<'_>) -> String {
    let mut write = true;
    let mut cutting = false;
    let mut output = Vec::new();

    for line in text.split('\n') {
        match Directive::parse(line) {
            Some(Directive::If(cond)) => write = scope.test(&cond),
            Some(Directive::Endif) => write = true,
            Some(Directive::Cut(_)) => cutting = Directive::inline_body(line).is_none(),
            Some(Directive::End) => cutting = false,
            Some(_) => {}
            None if write && !cutting => output.push(line),
            None => {}
        }
    }

    output.join("\n")
}

/// Replace `{{name}}` tokens from `scope`.
pub fn substitute(text: &str, scope: &Scope<'_>, unresolved: Unresolved) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures<'_>| match scope.get(&caps[1]) {
            Some(value) => value.to_owned(),
            None if unresolved == Unresolved::Keep => caps[0].to_owned(),
            None => String::new(),
        })
        .into_owned()
}

// ============================================================================
// Tests
// ============================================================================
