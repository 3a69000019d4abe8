//! Directive resolution engine.
//!
//! - **directive**: line grammar
//! - **collect**: first pass over all files (snippets, templates, globals)
//! - **include** / **index** / **snippets**: per-file line expansion
//! - **vars** / **template**: conditionals, substitution, template wrapping
//!
//! # Flow
//!
//! ```text
//! load all ──► collect ──► for each page:
//!                           include ──► index ──► snippets ──► vars + template
//! ```

pub mod collect;
pub mod directive;
pub mod include;
pub mod index;
pub mod markdown;
pub mod meta;
pub mod session;
pub mod snippets;
pub mod template;
pub mod vars;

use meta::FileRecord;
use session::BuildSession;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all files under `dir` in walk order, sorted by name per directory.
///
/// `skip` (typically the output directory) is not descended into.
pub fn collect_all_files(dir: &Path, skip: Option<&Path>) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| skip.is_none_or(|skip| e.path() != skip))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Run the per-file stages and return the final page text.
pub fn compile_page(record: &mut FileRecord, session: &BuildSession) -> String {
    include::expand_includes(record, session);
    index::expand_indexes(record, session);
    snippets::resolve_snippets(record, session);
    template::render_page(record, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_all_files_sorted_and_skipping() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("out")).unwrap();
        fs::write(root.join("c.html"), "").unwrap();
        fs::write(root.join("a.html"), "").unwrap();
        fs::write(root.join("b/z.md"), "").unwrap();
        fs::write(root.join("out/x.html"), "").unwrap();
        fs::write(root.join(".DS_Store"), "").unwrap();

        let out = root.join("out");
        let files: Vec<_> = collect_all_files(root, Some(&out))
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            files,
            [PathBuf::from("a.html"), PathBuf::from("b/z.md"), PathBuf::from("c.html")]
        );
    }

    #[test]
    fn test_compile_page_runs_all_stages() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("nav.html"), "<nav>{{site}}</nav>").unwrap();

        let mut session = BuildSession::new(dir.path());
        session.globals.insert("site".into(), "Example".into());
        session.snippets.insert("footer".into(), vec!["<!-- if !hide -->Bye<!-- endif -->".into()]);

        let mut record = FileRecord::from_text(
            &dir.path().join("page.html"),
            Path::new("page.html"),
            "<!-- include nav.html -->\n<!-- cut secret -->\nhidden\n<!-- end -->\n<!-- paste footer -->",
        );
        let html = compile_page(&mut record, &session);

        assert_eq!(html, "<nav>Example</nav>\nBye");
    }
}
