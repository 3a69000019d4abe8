//! File system watcher for live rebuilds.
//!
//! Monitors the input directory and runs a full fresh build after each burst
//! of changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────────┐
//! │  notify  │───▶│ Debouncer │───▶│  full rebuild    │
//! │  events  │    │  (300ms)  │    │  (WatchStatus)   │
//! └──────────┘    └───────────┘    └──────────────────┘
//! ```
//!
//! Rebuilds run on the watcher's own thread, one at a time.

use crate::{build::build_site, config::SiteConfig, log, logger::WatchStatus};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;
const REBUILD_COOLDOWN_MS: u64 = 800;

// =============================================================================
// Path Filters
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Paths that never trigger a rebuild: editor artifacts and our own output.
fn is_ignored(path: &Path, output: &Path) -> bool {
    is_temp_file(path) || path.starts_with(output)
}

/// `/proj/src/blog/post.md` → `blog/post.md`
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing and rebuild cooldown.
struct Debouncer {
    output: PathBuf,
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
}

impl Debouncer {
    fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            pending: FxHashSet::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    fn in_cooldown(&self) -> bool {
        self.last_rebuild
            .is_some_and(|t| t.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS))
    }

    fn add(&mut self, event: Event) {
        let before = self.pending.len();
        self.pending
            .extend(event.paths.into_iter().filter(|p| !is_ignored(p, &self.output)));
        if self.pending.len() > before {
            self.last_event = Some(Instant::now());
        }
    }

    /// Events that arrive during the cooldown stay pending until it ends.
    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && !self.in_cooldown()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn mark_rebuild(&mut self) {
        self.last_rebuild = Some(Instant::now());
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Rebuild
// =============================================================================

/// Summary of what triggered a rebuild, e.g. `index.html` or `a.md (+2 more)`.
fn describe_changes(paths: &[PathBuf], root: &Path) -> String {
    match paths {
        [] => String::new(),
        [only] => rel_path(only, root),
        [first, rest @ ..] => format!("{} (+{} more)", rel_path(first, root), rest.len()),
    }
}

/// Run a full build for the changed paths. Returns true on success.
fn rebuild(paths: &[PathBuf], config: &SiteConfig, status: &mut WatchStatus) -> bool {
    let trigger = describe_changes(paths, &config.build.input);

    match build_site(config) {
        Ok(report) => {
            status.success(&format!(
                "{trigger} changed, rebuilt {} pages, {} assets",
                report.pages, report.assets
            ));
            true
        }
        Err(e) => {
            status.error(&format!("{trigger} changed, build failed"), &format!("{e:#}"));
            false
        }
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the input directory and rebuild on change. Blocks until the event
/// channel closes.
pub fn watch_for_changes_blocking(config: &'static SiteConfig) -> Result<()> {
    let input = &config.build.input;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(input, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", input.display()))?;

    log!("watch"; "watching {}", rel_path(input, config.get_root()));

    let mut debouncer = Debouncer::new(&config.build.output);
    let mut status = WatchStatus::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add(event);
            }
            Ok(Err(e)) => {
                status.detach();
                log!("watch"; "error: {e}");
            }
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                // build logs print between statuses; start a fresh status line
                status.detach();
                if rebuild(&debouncer.take(), config, &mut status) {
                    debouncer.mark_rebuild();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}
