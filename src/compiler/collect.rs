//! First pass: snippet, template and global collection.
//!
//! Blocks are tracked on an explicit stack so nesting depth is unbounded:
//!
//! ```text
//! <!-- copy outer -->        push outer            stack: [outer]
//! a                          outer += a
//! <!-- copy inner -->        push inner            stack: [outer, inner]
//! b                          outer += b, inner += b
//! <!-- end -->               commit inner = [b]    stack: [outer]
//! <!-- end -->               commit outer = [a, b]
//! ```

use super::{
    directive::{BlockKind, Directive},
    meta::FileRecord,
    session::BuildSession,
};
use crate::debug;
use std::ops::RangeInclusive;

// ============================================================================
// Block Scanning
// ============================================================================

/// A block still waiting for its `end`.
#[derive(Debug)]
struct OpenBlock {
    name: String,
    kind: BlockKind,
    lines: Vec<String>,
    depth: usize,
    start: usize,
}

/// A closed (or force-closed at EOF) copy/cut/template block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub kind: BlockKind,
    pub lines: Vec<String>,
    /// Stack depth when the block was opened (0 = top level)
    pub depth: usize,
    /// Line range from the opening marker to the `end` marker.
    pub span: RangeInclusive<usize>,
}

impl OpenBlock {
    fn close(self, end: usize) -> Block {
        Block {
            name: self.name,
            kind: self.kind,
            lines: self.lines,
            depth: self.depth,
            span: self.start..=end,
        }
    }
}

/// Scan `lines` for blocks, calling `commit` for each one as it closes.
///
/// Lines that are not block markers are appended to every open block. A
/// block closed on its opening line commits at once with that line's body.
/// Blocks still open at the end are committed innermost first, spanning to
/// the last line.
pub fn scan_blocks<S: AsRef<str>>(lines: &[S], mut commit: impl FnMut(Block)) {
    let mut stack: Vec<OpenBlock> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let directive = Directive::parse(line);

        if let Some((kind, name)) = directive.as_ref().and_then(Directive::opens_block) {
            if let Some(body) = Directive::inline_body(line) {
                let lines: Vec<String> = if body.is_empty() {
                    Vec::new()
                } else {
                    vec![body.to_owned()]
                };
                for open in &mut stack {
                    open.lines.extend(lines.iter().cloned());
                }
                commit(Block {
                    name: name.to_owned(),
                    kind,
                    lines,
                    depth: stack.len(),
                    span: index..=index,
                });
                continue;
            }
            stack.push(OpenBlock {
                name: name.to_owned(),
                kind,
                lines: Vec::new(),
                depth: stack.len(),
                start: index,
            });
        } else if matches!(directive, Some(Directive::End)) {
            if let Some(open) = stack.pop() {
                commit(open.close(index));
            }
        } else {
            for open in &mut stack {
                open.lines.push(line.to_owned());
            }
        }
    }

    let last = lines.len().saturating_sub(1);
    while let Some(open) = stack.pop() {
        commit(open.close(last));
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Collect snippets, templates and globals from every record, in order.
///
/// Later definitions of a name replace earlier ones.
pub fn collect(records: &[FileRecord], session: &mut BuildSession) {
    for record in records {
        scan_blocks(&record.lines, |block| {
            let table = match block.kind {
                BlockKind::Copy | BlockKind::Cut => &mut session.snippets,
                BlockKind::Template => &mut session.templates,
            };
            if table.insert(block.name.clone(), block.lines).is_some() {
                debug!("collect"; "{}: redefines `{}`", record.display_name(), block.name);
            }
        });
    }

    for record in records {
        collect_globals(record, session);
    }

    debug!(
        "collect";
        "{} snippets, {} templates, {} globals",
        session.snippets.len(),
        session.templates.len(),
        session.globals.len()
    );
}

fn collect_globals(record: &FileRecord, session: &mut BuildSession) {
    for line in &record.lines {
        if let Some(Directive::Global { name, value }) = Directive::parse(line) {
            session.globals.insert(name, value);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
