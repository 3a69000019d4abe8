//! Snippet resolution: cut removal and paste expansion.
//!
//! # Flow
//!
//! ```text
//! lines ──► local scan ──► cut removal ──► paste expansion (≤ MAX_PASSES)
//!              │                                 ▲
//!              └── local snippets ───────────────┘ (shadow global ones)
//! ```
//!
//! Pasted bodies may contain further `paste` lines, so expansion repeats until
//! a pass substitutes nothing. Each line remembers the chain of snippets it
//! came from; pasting a name already on that chain is a cycle and is dropped.
//! The pass cap bounds deep but acyclic nesting.

use super::{
    collect::scan_blocks,
    directive::{BlockKind, Directive},
    meta::FileRecord,
    session::{BuildSession, Table},
};
use crate::log;
use std::{collections::BTreeSet, ops::RangeInclusive, rc::Rc};

/// Snippet names a line was pasted through, outermost first.
type Chain = Rc<[String]>;

/// Upper bound on paste expansion passes per file.
pub const MAX_PASSES: usize = 10;

/// Resolve cut blocks and paste directives of one file in place.
pub fn resolve_snippets(record: &mut FileRecord, session: &BuildSession) {
    let (local, cuts) = scan_local(&record.lines);

    let lines = std::mem::take(&mut record.lines)
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !cuts.iter().any(|range| range.contains(index)))
        .map(|(_, line)| line)
        .collect();

    let origin = record.display_name();
    record.lines = expand_pastes(
        lines,
        &local,
        &session.snippets,
        &origin,
        &mut record.used_snippets,
    );
}

/// Snippets defined in this file, and the line ranges of its cut blocks.
fn scan_local<S: AsRef<str>>(lines: &[S]) -> (Table, Vec<RangeInclusive<usize>>) {
    let mut local = Table::default();
    let mut cuts = Vec::new();

    scan_blocks(lines, |block| match block.kind {
        BlockKind::Copy => {
            local.insert(block.name, block.lines);
        }
        BlockKind::Cut => {
            cuts.push(block.span);
            local.insert(block.name, block.lines);
        }
        BlockKind::Template => {}
    });

    (local, cuts)
}

/// Replace `paste` lines with snippet bodies, `local` first, then `global`.
///
/// Block markers are stripped along the way; a one-line block keeps its body.
/// Undefined names are dropped with a warning, and so is a paste of a name
/// it was itself pasted from, which keeps output linear in the definitions.
/// Names that were pasted are added to `used`.
pub fn expand_pastes(
    lines: Vec<String>,
    local: &Table,
    global: &Table,
    origin: &str,
    used: &mut BTreeSet<String>,
) -> Vec<String> {
    let root: Chain = Rc::from([]);
    let mut current: Vec<(String, Chain)> = lines
        .into_iter()
        .map(|line| (line, Rc::clone(&root)))
        .collect();

    for _ in 0..MAX_PASSES {
        let mut substituted = false;
        let mut next = Vec::with_capacity(current.len());

        for (line, chain) in current {
            match Directive::parse(&line) {
                Some(Directive::Paste(name)) => {
                    substituted = true;
                    if chain.contains(&name) {
                        log!("warn"; "{origin}: recursive paste of `{name}` via {}", chain.join(" > "));
                        continue;
                    }
                    match local.get(&name).or_else(|| global.get(&name)) {
                        Some(body) => {
                            let inner: Chain = chain.iter().cloned().chain([name.clone()]).collect();
                            next.extend(body.iter().map(|l| (l.clone(), Rc::clone(&inner))));
                            used.insert(name);
                        }
                        None => log!("warn"; "{origin}: undefined snippet `{name}`"),
                    }
                }
                Some(directive) if directive.is_block_marker() => {
                    if let Some(body) = Directive::inline_body(&line).filter(|b| !b.is_empty()) {
                        next.push((body.to_owned(), chain));
                    }
                }
                _ => next.push((line, chain)),
            }
        }

        current = next;
        if !substituted {
            break;
        }
    }

    let pending = current
        .iter()
        .filter(|(line, _)| matches!(Directive::parse(line), Some(Directive::Paste(_))))
        .count();
    if pending > 0 {
        log!(
            "warn";
            "{origin}: stopped expanding snippets after {MAX_PASSES} passes ({pending} left)"
        );
    }

    current.into_iter().map(|(line, _)| line).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_owned).collect()
    }

    fn table(entries: &[(&str, &str)]) -> Table {
        entries
            .iter()
            .map(|(name, body)| ((*name).to_owned(), lines(body)))
            .collect()
    }

    fn resolve(text: &str, global: Table) -> FileRecord {
        let mut session = BuildSession::default();
        session.snippets = global;
        let mut record = FileRecord::from_text(Path::new("f.html"), Path::new("f.html"), text);
        resolve_snippets(&mut record, &session);
        record
    }

    #[test]
    fn test_paste_inserts_exact_body() {
        let record = resolve("a\n<!-- paste footer -->\nb", table(&[("footer", "  Bye\n\n<em>x</em>")]));
        assert_eq!(record.lines, ["a", "  Bye", "", "<em>x</em>", "b"]);
        assert!(record.used_snippets.contains("footer"));
    }

    #[test]
    fn test_copy_markers_stripped_body_kept() {
        let record = resolve("<!-- copy x -->\nhello\n<!-- end -->\n<!-- paste x -->", Table::default());
        assert_eq!(record.lines, ["hello", "hello"]);
    }

    #[test]
    fn test_cut_removed_but_pasteable() {
        let record = resolve(
            "before\n<!-- cut x -->\nsecret\n<!-- end -->\nafter\n<!-- paste x -->",
            Table::default(),
        );
        assert_eq!(record.lines, ["before", "after", "secret"]);
    }

    #[test]
    fn test_nested_cut_inside_copy() {
        let record = resolve(
            "<!-- copy outer -->\na\n<!-- cut inner -->\nb\n<!-- end -->\nc\n<!-- end -->",
            Table::default(),
        );
        assert_eq!(record.lines, ["a", "c"]);
    }

    #[test]
    fn test_local_snippet_shadows_global() {
        let global = table(&[("x", "global")]);
        let record = resolve("<!-- copy x -->\nlocal\n<!-- end -->\n<!-- paste x -->", global.clone());
        assert_eq!(record.lines, ["local", "local"]);

        let other = resolve("<!-- paste x -->", global);
        assert_eq!(other.lines, ["global"]);
    }

    #[test]
    fn test_nested_paste_resolves() {
        let global = table(&[("a", "<!-- paste b -->\nA"), ("b", "<!-- paste c -->\nB"), ("c", "C")]);
        let record = resolve("<!-- paste a -->", global);
        assert_eq!(record.lines, ["C", "B", "A"]);
        assert_eq!(record.used_snippets.len(), 3);
    }

    #[test]
    fn test_undefined_paste_dropped() {
        let record = resolve("a\n<!-- paste nope -->\nb", Table::default());
        assert_eq!(record.lines, ["a", "b"]);
        assert!(record.used_snippets.is_empty());
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let global = table(&[("a", "A\n<!-- paste b -->"), ("b", "B\n<!-- paste a -->")]);
        let record = resolve("<!-- paste a -->", global);
        assert_eq!(record.lines, ["A", "B"]);
    }

    #[test]
    fn test_self_paste_does_not_multiply() {
        let global = table(&[(
            "a",
            "x\n<!-- paste a -->\n<!-- paste a -->\n<!-- paste a -->",
        )]);
        let record = resolve("<!-- paste a -->", global);
        assert_eq!(record.lines, ["x"]);
    }

    #[test]
    fn test_repeated_paste_without_cycle() {
        let global = table(&[("row", "<!-- paste cell -->\n<!-- paste cell -->"), ("cell", "c")]);
        let record = resolve("<!-- paste row -->\n<!-- paste row -->", global);
        assert_eq!(record.lines, ["c", "c", "c", "c"]);
    }

    #[test]
    fn test_deep_chain_stops_at_pass_cap() {
        let global: Table = (0..MAX_PASSES + 5)
            .map(|i| (format!("s{i}"), vec![format!("<!-- paste s{} -->", i + 1)]))
            .collect();
        let record = resolve("<!-- paste s0 -->", global);
        assert_eq!(record.lines, [format!("<!-- paste s{MAX_PASSES} -->")]);
    }

    #[test]
    fn test_one_line_block_keeps_body() {
        let record = resolve(
            "<!-- copy footer -->Bye<!-- end -->\n<!-- cut x -->gone<!-- end -->\n<!-- paste x -->",
            Table::default(),
        );
        assert_eq!(record.lines, ["Bye", "gone"]);
    }

    #[test]
    fn test_endif_survives_for_block_sweep() {
        let record = resolve("<!-- if a -->\nx\n<!-- endif -->", Table::default());
        assert_eq!(record.lines, ["<!-- if a -->", "x", "<!-- endif -->"]);
    }

    #[test]
    fn test_template_block_markers_stripped() {
        let record = resolve("<!-- template t -->\n<main>{{content}}</main>\n<!-- end -->", Table::default());
        assert_eq!(record.lines, ["<main>{{content}}</main>"]);
    }

    #[test]
    fn test_unclosed_cut_runs_to_eof() {
        let record = resolve("keep\n<!-- cut x -->\ngone\nalso gone", Table::default());
        assert_eq!(record.lines, ["keep"]);
    }
}
