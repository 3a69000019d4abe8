//! Variable resolution and template wrapping of a page.

use super::{
    meta::FileRecord,
    session::{BuildSession, Table},
    snippets::expand_pastes,
    vars::{Scope, Unresolved, collect_locals, resolve},
};
use crate::log;

/// Variable naming the template that wraps a page.
pub const TEMPLATE_VAR: &str = "template";

/// Token replaced by the page body inside a template.
pub const CONTENT_TOKEN: &str = "{{content}}";

/// Resolve a page's variables and wrap it in its template, if it names one.
///
/// The body is resolved on its own first. The template's pastes are then
/// expanded from the global snippets, `{{content}}` receives the body, and the
/// combined text gets one more resolution pass with the page's scope.
pub fn render_page(record: &mut FileRecord, session: &BuildSession) -> String {
    let locals = collect_locals(&record.lines);
    let scope = Scope::new(&locals, &record.meta, &session.globals);
    let body = resolve(&record.lines.join("\n"), &scope, Unresolved::Remove);

    let Some(name) = scope.get(TEMPLATE_VAR) else {
        return body;
    };
    let Some(template) = session.templates.get(name) else {
        log!("warn"; "{}: template `{name}` not found", record.relative.display());
        return body;
    };

    let origin = record.relative.display().to_string();
    let expanded = expand_pastes(
        template.clone(),
        &Table::default(),
        &session.snippets,
        &origin,
        &mut record.used_snippets,
    );
    let wrapped = expanded.join("\n").replace(CONTENT_TOKEN, &body);
    resolve(&wrapped, &scope, Unresolved::Remove)
}
