//! `index` expansion: generated listings of source files.
//!
//! ```text
//! <!-- index posts/*.md post-item date -->
//!        │            │         │
//!        │            │         └─ optional sort field
//!        │            └─ template rendered once per match
//!        └─ glob, relative to the source root
//! ```
//!
//! Each match contributes its frontmatter plus computed `filepath`,
//! `filename` and `title` fields. Date fields sort newest first, everything
//! else ascending.

use super::{
    directive::{Directive, IndexSpec},
    meta::{self, FileRecord, MARKDOWN_EXTENSIONS, MARKUP_EXTENSIONS, MetaValue, Metadata},
    session::{BuildSession, Table, Vars},
    snippets::expand_pastes,
    vars::{Scope, Unresolved, resolve},
};
use crate::{debug, log, utils::date::parse_timestamp};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

/// Sort fields compared as dates, newest first.
const DATE_FIELDS: &[&str] = &["date", "created", "modified", "published"];

/// Metadata of one matched file.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub meta: Metadata,
}

// ============================================================================
// Expansion
// ============================================================================

/// Replace every `index` line of `record` with its rendered listing.
pub fn expand_indexes(record: &mut FileRecord, session: &BuildSession) {
    if !record
        .lines
        .iter()
        .any(|line| matches!(Directive::parse(line), Some(Directive::Index(_))))
    {
        return;
    }

    let origin = record.display_name();
    let mut output = Vec::with_capacity(record.lines.len());

    for line in std::mem::take(&mut record.lines) {
        let Some(Directive::Index(spec)) = Directive::parse(&line) else {
            output.push(line);
            continue;
        };

        match render_index(&spec, session, &origin, &mut record.used_snippets) {
            Some(rendered) => output.extend(rendered),
            None => output.push(line),
        }
    }
    record.lines = output;
}

/// Render one index directive. `None` keeps the directive line as it is.
fn render_index(
    spec: &IndexSpec,
    session: &BuildSession,
    origin: &str,
    used: &mut BTreeSet<String>,
) -> Option<Vec<String>> {
    let Some(template) = session.templates.get(&spec.template) else {
        log!("warn"; "{origin}: index template `{}` not found", spec.template);
        return None;
    };

    let mut entries = match load_entries(&session.root, &spec.pattern) {
        Ok(entries) => entries,
        Err(err) => {
            log!("warn"; "{origin}: invalid index pattern `{}`: {err}", spec.pattern);
            return None;
        }
    };

    debug!("index"; "{origin}: {} matches for `{}`", entries.len(), spec.pattern);

    if let Some(field) = &spec.sort {
        sort_entries(&mut entries, field);
    }

    let template = expand_pastes(
        template.clone(),
        &Table::default(),
        &session.snippets,
        origin,
        used,
    )
    .join("\n");

    let no_locals = Vars::new();
    let rendered = entries
        .iter()
        .flat_map(|entry| {
            let scope = Scope::new(&no_locals, &entry.meta, &session.globals);
            let text = resolve(&template, &scope, Unresolved::Keep);
            meta::split_lines(&text)
        })
        .collect();

    Some(rendered)
}

// ============================================================================
// Entries
// ============================================================================

/// Glob `pattern` under `root` and load each indexable match.
///
/// Matches come back in path order. Unreadable files are skipped.
pub fn load_entries(root: &Path, pattern: &str) -> Result<Vec<IndexEntry>, glob::PatternError> {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full)?
        .filter_map(Result::ok)
        .filter(|path| path.is_file() && is_indexable(path))
        .filter_map(|path| load_entry(root, path))
        .collect();

    Ok(entries)
}

fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS.contains(&ext.as_str()) || MARKUP_EXTENSIONS.contains(&ext.as_str())
        })
}

fn load_entry(root: &Path, path: PathBuf) -> Option<IndexEntry> {
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            log!("warn"; "index: cannot read {}: {err}", path.display());
            return None;
        }
    };

    let (mut meta, body) = meta::split_frontmatter(&text);
    let rel = path.strip_prefix(root).unwrap_or(&path);

    let filepath = meta::output_path(rel)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    meta.insert("filepath".into(), MetaValue::Text(filepath));
    meta.insert("filename".into(), MetaValue::Text(filename));
    if !meta.contains_key("title") {
        meta.insert("title".into(), MetaValue::Text(derive_title(body, &path)));
    }

    Some(IndexEntry { meta })
}

/// First `# ` heading of the body, else the file stem.
fn derive_title(body: &str, path: &Path) -> String {
    body.lines()
        .find_map(|line| line.trim().strip_prefix("# "))
        .map(|title| title.trim().to_owned())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

// ============================================================================
// Sorting
// ============================================================================

/// Stable sort by `field`: date fields descending, anything else ascending.
pub fn sort_entries(entries: &mut [IndexEntry], field: &str) {
    let descending = is_date_field(field);
    entries.sort_by(|a, b| {
        let (a, b) = (sort_key(&a.meta, field), sort_key(&b.meta, field));
        if descending { b.total_cmp(&a) } else { a.total_cmp(&b) }
    });
}

fn is_date_field(field: &str) -> bool {
    DATE_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(field))
}

/// Numeric sort key for one entry. Missing fields and unparseable dates are 0.
fn sort_key(meta: &Metadata, field: &str) -> f64 {
    let Some(value) = meta.get(field) else {
        return 0.0;
    };

    if is_date_field(field) {
        #[allow(clippy::cast_precision_loss)]
        return parse_timestamp(value.as_str()).map_or(0.0, |t| t as f64);
    }

    value
        .as_number()
        .or_else(|| value.as_str().trim().parse::<f64>().ok())
        .filter(|n| !n.is_nan())
        .unwrap_or_else(|| text_key(value.as_str()))
}

/// Case-insensitive polynomial hash, so text values still order totally.
fn text_key(s: &str) -> f64 {
    s.to_lowercase()
        .chars()
        .fold(0.0, |hash, c| hash * 31.0 + f64::from(u32::from(c)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(pairs: &[(&str, &str)]) -> IndexEntry {
        IndexEntry {
            meta: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), MetaValue::parse(v)))
                .collect(),
        }
    }

    fn values(entries: &[IndexEntry], field: &str) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.meta.get(field).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_sort_dates_descending_unparseable_last() {
        let mut entries = vec![
            entry(&[("date", "2024-01-01")]),
            entry(&[("date", "01/02/2024")]),
            entry(&[("date", "not-a-date")]),
        ];
        sort_entries(&mut entries, "date");
        assert_eq!(values(&entries, "date"), ["01/02/2024", "2024-01-01", "not-a-date"]);
    }

    #[test]
    fn test_sort_date_field_is_case_insensitive() {
        let mut entries = vec![
            entry(&[("Published", "2020-01-01")]),
            entry(&[("Published", "2021-01-01")]),
        ];
        sort_entries(&mut entries, "Published");
        assert_eq!(values(&entries, "Published"), ["2021-01-01", "2020-01-01"]);
    }

    #[test]
    fn test_sort_numbers_ascending() {
        let mut entries = vec![
            entry(&[("order", "10")]),
            entry(&[("order", "2")]),
            entry(&[("order", "-1.5")]),
        ];
        sort_entries(&mut entries, "order");
        assert_eq!(values(&entries, "order"), ["-1.5", "2", "10"]);
    }

    #[test]
    fn test_sort_text_by_hash_is_stable() {
        let mut entries = vec![
            entry(&[("name", "b"), ("n", "1")]),
            entry(&[("name", "a")]),
            entry(&[("name", "B"), ("n", "2")]),
        ];
        sort_entries(&mut entries, "name");
        // "b" and "B" hash equal and keep their input order
        assert_eq!(values(&entries, "name"), ["a", "b", "B"]);
        assert_eq!(values(&entries, "n"), ["", "1", "2"]);
    }

    #[test]
    fn test_sort_missing_field_is_zero() {
        let mut entries = vec![entry(&[("order", "5")]), entry(&[]), entry(&[("order", "-5")])];
        sort_entries(&mut entries, "order");
        assert_eq!(values(&entries, "order"), ["-5", "", "5"]);
    }

    #[test]
    fn test_text_key() {
        assert_eq!(text_key(""), 0.0);
        assert_eq!(text_key("a"), 97.0);
        assert_eq!(text_key("ab"), 97.0 * 31.0 + 98.0);
        assert_eq!(text_key("AB"), text_key("ab"));
    }

    #[test]
    fn test_load_entries_computes_fields() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/b.md"), "---\ndate: 2024-01-01\n---\n# Second Post\n").unwrap();
        fs::write(dir.path().join("posts/a.md"), "---\ntitle: First\n---\nbody").unwrap();
        fs::write(dir.path().join("posts/c.html"), "<p>no title</p>").unwrap();
        fs::write(dir.path().join("posts/d.png"), [0u8, 1, 2]).unwrap();

        let entries = load_entries(dir.path(), "posts/*").unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].meta["title"].as_str(), "First");
        assert_eq!(entries[0].meta["filepath"].as_str(), "posts/a.html");
        assert_eq!(entries[0].meta["filename"].as_str(), "a.md");

        assert_eq!(entries[1].meta["title"].as_str(), "Second Post");
        assert_eq!(entries[1].meta["date"].as_str(), "2024-01-01");

        assert_eq!(entries[2].meta["title"].as_str(), "c");
        assert_eq!(entries[2].meta["filepath"].as_str(), "posts/c.html");
    }

    #[test]
    fn test_load_entries_no_matches() {
        let dir = TempDir::new().unwrap();
        assert!(load_entries(dir.path(), "nothing/*.md").unwrap().is_empty());
    }

    fn index_session(dir: &TempDir) -> BuildSession {
        let mut session = BuildSession::new(dir.path());
        session.templates.insert(
            "item".into(),
            vec![
                "<li><a href=\"{{filepath}}\">{{title}}</a>{{page_note}}</li>".into(),
                "<!-- paste badge -->".into(),
            ],
        );
        session
            .snippets
            .insert("badge".into(), vec!["<!-- if draft --><b>draft</b><!-- endif -->".into()]);
        session
    }

    #[test]
    fn test_expand_indexes_renders_sorted_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/old.md"), "---\ntitle: Old\ndate: 2020-01-01\n---\n").unwrap();
        fs::write(dir.path().join("posts/new.md"), "---\ntitle: New\ndate: 2024-05-01\ndraft: true\n---\n").unwrap();

        let session = index_session(&dir);
        let mut record = FileRecord::from_text(
            Path::new("index.html"),
            Path::new("index.html"),
            "<ul>\n<!-- index posts/*.md item date -->\n</ul>",
        );
        expand_indexes(&mut record, &session);

        assert_eq!(
            record.lines,
            [
                "<ul>",
                "<li><a href=\"posts/new.html\">New</a>{{page_note}}</li>",
                "<b>draft</b>",
                "<li><a href=\"posts/old.html\">Old</a>{{page_note}}</li>",
                "",
                "</ul>",
            ]
        );
        assert!(record.used_snippets.contains("badge"));
    }

    #[test]
    fn test_expand_indexes_missing_template_keeps_line() {
        let dir = TempDir::new().unwrap();
        let session = BuildSession::new(dir.path());
        let mut record = FileRecord::from_text(
            Path::new("index.html"),
            Path::new("index.html"),
            "<!-- index *.md nope -->",
        );
        expand_indexes(&mut record, &session);
        assert_eq!(record.lines, ["<!-- index *.md nope -->"]);
    }

    #[test]
    fn test_expand_indexes_zero_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let session = index_session(&dir);
        let mut record = FileRecord::from_text(
            Path::new("index.html"),
            Path::new("index.html"),
            "a\n<!-- index none/*.md item -->\nb",
        );
        expand_indexes(&mut record, &session);
        assert_eq!(record.lines, ["a", "b"]);
    }

    #[test]
    fn test_expand_indexes_invalid_pattern_keeps_line() {
        let dir = TempDir::new().unwrap();
        let session = index_session(&dir);
        let mut record = FileRecord::from_text(
            Path::new("index.html"),
            Path::new("index.html"),
            "a\n<!-- index posts/[*.md item -->\nb",
        );
        expand_indexes(&mut record, &session);
        assert_eq!(record.lines, ["a", "<!-- index posts/[*.md item -->", "b"]);
    }

    #[test]
    fn test_expand_indexes_with_markdown_template() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/a.md"), "# A\n").unwrap();

        let template = FileRecord::from_text(
            &dir.path().join("_tpl.md"),
            Path::new("_tpl.md"),
            "<!-- template item -->\n- [{{title}}]({{filepath}})\n<!-- end -->\n",
        );
        let mut session = BuildSession::new(dir.path());
        crate::compiler::collect::collect(&[template], &mut session);

        let mut record = FileRecord::from_text(
            Path::new("index.html"),
            Path::new("index.html"),
            "<!-- index posts/*.md item -->",
        );
        expand_indexes(&mut record, &session);

        let html = record.lines.join("\n");
        assert!(html.contains(r#"<li><a href="posts/a.html">A</a></li>"#), "{html}");
    }
}
