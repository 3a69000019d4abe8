//! `include` expansion.

use super::{directive::Directive, meta::FileRecord, session::BuildSession};
use crate::log;
use std::fs;

/// Replace each `include PATH` line with the contents of `PATH`, resolved
/// against the source root.
///
/// Included text is inserted raw, without frontmatter handling or markdown
/// rendering, and is not scanned for further includes. An unreadable path
/// keeps the directive line and logs a warning.
pub fn expand_includes(record: &mut FileRecord, session: &BuildSession) {
    if !record
        .lines
        .iter()
        .any(|line| matches!(Directive::parse(line), Some(Directive::Include(_))))
    {
        return;
    }

    let mut output = Vec::with_capacity(record.lines.len());
    for line in std::mem::take(&mut record.lines) {
        let Some(Directive::Include(path)) = Directive::parse(&line) else {
            output.push(line);
            continue;
        };

        match fs::read_to_string(session.root.join(&path)) {
            Ok(text) => output.extend(
                text.trim_end_matches(['\n', '\r'])
                    .split('\n')
                    .map(str::to_owned),
            ),
            Err(err) => {
                log!("warn"; "{}: cannot include `{path}`: {err}", record.display_name());
                output.push(line);
            }
        }
    }
    record.lines = output;
}
