//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── prepare_output() ──► clean / create output directory
//!     │
//!     ├── load pages ──► FileRecord per .md/.html/.txt file
//!     │
//!     ├── collect() ──► snippets, templates, globals → BuildSession
//!     │
//!     ├── compile_page() ──► write each page
//!     │
//!     └── copy_asset() ──► everything else, byte-for-byte
//! ```
//!
//! A fresh [`BuildSession`] is created for every call, so rebuilds never see
//! names from a previous build.

use crate::{
    compiler::{
        collect::collect,
        collect_all_files, compile_page,
        meta::{FileRecord, SourceKind},
        session::BuildSession,
    },
    config::SiteConfig,
    debug, log,
};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Counts of what a build wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    pub assets: usize,
}

/// Build the entire site from `[build] input` into `[build] output`.
///
/// Unreadable pages are skipped with a warning. Any failure to create the
/// output tree, write a page or copy an asset aborts the build.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let input = &config.build.input;
    let output = &config.build.output;

    prepare_output(output, config.build.clean)?;

    let (pages, assets): (Vec<PathBuf>, Vec<PathBuf>) = collect_all_files(input, Some(output))
        .into_iter()
        .partition(|path| SourceKind::of(path).is_page());

    let mut records: Vec<FileRecord> = pages
        .iter()
        .filter_map(|path| match FileRecord::load(path, input) {
            Ok(record) => Some(record),
            Err(e) => {
                log!("warn"; "skipping {}: {:#}", rel_display(path, input), e);
                None
            }
        })
        .collect();

    let mut session = BuildSession::new(input);
    collect(&records, &mut session);

    for record in &mut records {
        let html = compile_page(record, &session);
        write_page(output, &record.relative, &html)?;
        debug!("compile"; "{} -> {}", rel_display(&record.source, input), record.display_name());
    }

    for path in &assets {
        copy_asset(path, input, output)?;
    }

    let report = BuildReport {
        pages: records.len(),
        assets: assets.len(),
    };
    log_build_result(&report);

    Ok(report)
}

/// Make sure the output directory exists, removing it first when `clean`.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear output directory: {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

fn write_page(output: &Path, relative: &Path, html: &str) -> Result<()> {
    let dest = output.join(relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&dest, html).with_context(|| format!("Failed to write {}", dest.display()))
}

fn copy_asset(path: &Path, input: &Path, output: &Path) -> Result<()> {
    let relative = path.strip_prefix(input).unwrap_or(path);
    let dest = output.join(relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(path, &dest)
        .with_context(|| format!("Failed to copy {} to {}", path.display(), dest.display()))?;
    debug!("assets"; "{}", relative.display());
    Ok(())
}

fn rel_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn log_build_result(report: &BuildReport) {
    if report.pages == 0 && report.assets == 0 {
        log!("warn"; "output is empty, check the input directory");
    } else {
        log!("build"; "{} pages, {} assets", report.pages, report.assets);
    }
}
