//! SSR guard patcher.
//!
//! Rewrites uses of browser-only globals so that server-side rendering does
//! not crash on them. Two rules run in order over each file:
//!
//! 1. `localStorage.getItem(...)` (also `setItem`, `removeItem`, `clear`)
//!    becomes `(typeof window !== 'undefined' ? localStorage.getItem(...) : null)`.
//! 2. `window.location...`, `window.open(...)` and the other listed members
//!    become `(typeof window !== 'undefined' ? <expr> : undefined)`.
//!
//! The rewrite is textual and best-effort. Sites that are already guarded,
//! operands of `typeof`, assignment targets, commented out, or whose
//! argument list cannot be balanced are left untouched. Running the patcher
//! on its own output changes nothing.

mod scan;

use std::fs;
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::walk::{collect_source_files, WalkOptions};

/// Condition inserted in front of every guarded expression.
pub const WINDOW_GUARD: &str = "typeof window !== 'undefined'";

// ============================================================================
// Rules
// ============================================================================

/// Which rewrite rule produced an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// `localStorage.<method>(...)`, falls back to `null`.
    LocalStorage,
    /// `window.<member>...`, falls back to `undefined`.
    Window,
}

impl GuardKind {
    /// Rules in the order they are applied.
    pub const ALL: [GuardKind; 2] = [GuardKind::LocalStorage, GuardKind::Window];

    /// Value the guarded expression evaluates to outside a browser.
    pub fn fallback(self) -> &'static str {
        match self {
            GuardKind::LocalStorage => "null",
            GuardKind::Window => "undefined",
        }
    }

    fn call_required(self) -> bool {
        matches!(self, GuardKind::LocalStorage)
    }

    fn regex(self) -> &'static Regex {
        static LOCAL_STORAGE: OnceLock<Regex> = OnceLock::new();
        static WINDOW: OnceLock<Regex> = OnceLock::new();
        match self {
            GuardKind::LocalStorage => LOCAL_STORAGE.get_or_init(|| {
                Regex::new(r"\blocalStorage\.(?:getItem|setItem|removeItem|clear)\b")
                    .expect("localStorage regex is valid")
            }),
            GuardKind::Window => WINDOW.get_or_init(|| {
                Regex::new(
                    r"\bwindow\.(?:location|open|confirm|alert|localStorage|sessionStorage|history|print|addEventListener|removeEventListener)\b(?:\.[A-Za-z_$][A-Za-z0-9_$]*)*",
                )
                .expect("window regex is valid")
            }),
        }
    }

    /// Wrap an expression in the window guard.
    pub fn wrap(self, expr: &str) -> String {
        format!("({} ? {} : {})", WINDOW_GUARD, expr, self.fallback())
    }
}

// ============================================================================
// Source Rewriting
// ============================================================================

/// A single rewritten call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardEdit {
    /// Rule that produced the edit.
    pub rule: GuardKind,
    /// 1-based line of the site.
    pub line: u32,
    /// 1-based column (in characters) of the site, in the text the rule ran on.
    pub col: u32,
    /// Text before the rewrite.
    pub original: String,
    /// Text after the rewrite.
    pub replacement: String,
}

/// Result of guarding one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    /// Rewritten text.
    pub text: String,
    /// Edits in application order.
    pub edits: Vec<GuardEdit>,
}

impl GuardOutcome {
    /// Whether any site was rewritten.
    pub fn changed(&self) -> bool {
        !self.edits.is_empty()
    }
}

/// Apply every rule to `source` and return the rewritten text.
///
/// Rewrites only insert text on the line of each site, so the line count of
/// the output equals the line count of the input.
pub fn guard_source(source: &str) -> GuardOutcome {
    let mut text = source.to_string();
    let mut edits = Vec::new();
    for kind in GuardKind::ALL {
        text = apply_rule(&text, kind, &mut edits);
    }
    GuardOutcome { text, edits }
}

fn apply_rule(text: &str, kind: GuardKind, edits: &mut Vec<GuardEdit>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let wrapped = scan::wrapped_spans(text);

    for m in kind.regex().find_iter(text) {
        // Inside a site already consumed by this pass (nested call).
        if m.start() < cursor {
            continue;
        }
        let Some(site) = call_site(text, kind, m.range(), &wrapped) else {
            continue;
        };

        let original = &text[site.clone()];
        let replacement = kind.wrap(original);
        let (line, col) = scan::line_col(text, site.start);
        debug!("Guarding {:?} at {}:{}: {}", kind, line, col, original);

        out.push_str(&text[cursor..site.start]);
        out.push_str(&replacement);
        edits.push(GuardEdit {
            rule: kind,
            line,
            col,
            original: original.to_string(),
            replacement,
        });
        cursor = site.end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Decide whether a regex match is a site to rewrite, and its full extent.
fn call_site(
    text: &str,
    kind: GuardKind,
    callee: Range<usize>,
    wrapped: &[Range<usize>],
) -> Option<Range<usize>> {
    let prefix = scan::line_prefix(text, callee.start);
    if scan::inside_any(wrapped, callee.start)
        || scan::is_member_access(text, callee.start)
        || scan::follows_operator_keyword(prefix)
        || scan::in_comment(prefix)
        || scan::is_guarded(prefix)
    {
        return None;
    }

    let site = scan::extend_over_call(text, callee, kind.call_required())?;
    let is_call = text[..site.end].ends_with(')');
    if !is_call && scan::is_assignment_target(&text[site.end..]) {
        return None;
    }
    Some(site)
}

// ============================================================================
// File and Tree Patching
// ============================================================================

/// Whether patched files are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Rewrite files in place.
    #[default]
    Apply,
    /// Compute edits only.
    DryRun,
}

/// Edits made (or proposed) for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePatch {
    /// Path relative to the patched root.
    pub path: String,
    /// Edits in application order.
    pub edits: Vec<GuardEdit>,
    /// Content before patching.
    #[serde(skip)]
    pub before: String,
    /// Content after patching.
    #[serde(skip)]
    pub after: String,
}

/// A file the patcher could not process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path relative to the patched root.
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of patching one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Nothing matched; the file was not touched.
    Unchanged,
    /// At least one site was rewritten.
    Patched(FilePatch),
    /// The file could not be read, decoded or written.
    Skipped(SkippedFile),
}

/// Options for [`guard_tree`].
#[derive(Debug, Clone, Default)]
pub struct GuardOptions {
    pub walk: WalkOptions,
    pub mode: WriteMode,
}

/// Summary of a tree run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchReport {
    /// Number of candidate files examined.
    pub files_scanned: u32,
    /// Number of files that were (or would be) rewritten.
    pub files_modified: u32,
    /// Total rewritten sites.
    pub edits_count: u32,
    /// Whether files were left untouched.
    pub dry_run: bool,
    /// Per-file edits, sorted by path.
    pub files: Vec<FilePatch>,
    /// Files that could not be processed.
    pub skipped: Vec<SkippedFile>,
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Guard a single file, writing it back unless `mode` is a dry run.
///
/// `root` only affects the path recorded in the outcome. Content is read and
/// written as UTF-8; files that are not valid UTF-8 are skipped.
pub fn guard_file(root: &Path, path: &Path, mode: WriteMode) -> FileOutcome {
    let rel = display_path(root, path);
    let skipped = |reason: String| {
        warn!("Skipping {}: {}", rel, reason);
        FileOutcome::Skipped(SkippedFile {
            path: rel.clone(),
            reason,
        })
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return skipped(format!("read failed: {}", e)),
    };
    let before = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return skipped("not valid UTF-8".to_string()),
    };

    let outcome = guard_source(&before);
    if !outcome.changed() {
        return FileOutcome::Unchanged;
    }

    if mode == WriteMode::Apply {
        if let Err(e) = write_in_place(path, &outcome.text) {
            return skipped(format!("write failed: {}", e));
        }
        debug!("Rewrote {} ({} edits)", rel, outcome.edits.len());
    }

    FileOutcome::Patched(FilePatch {
        path: rel.clone(),
        edits: outcome.edits,
        before,
        after: outcome.text,
    })
}

/// Replace a file's content through a sibling temp file and a rename,
/// keeping the original permissions.
fn write_in_place(path: &Path, contents: &str) -> io::Result<()> {
    let permissions = fs::metadata(path)?.permissions();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Walk `root` and guard every candidate file.
pub fn guard_tree(root: &Path, options: &GuardOptions) -> PatchReport {
    let files = collect_source_files(root, &options.walk);
    let mut report = PatchReport {
        dry_run: options.mode == WriteMode::DryRun,
        ..PatchReport::default()
    };

    for path in &files {
        report.files_scanned += 1;
        match guard_file(root, path, options.mode) {
            FileOutcome::Unchanged => {}
            FileOutcome::Patched(patch) => {
                report.files_modified += 1;
                report.edits_count += patch.edits.len() as u32;
                report.files.push(patch);
            }
            FileOutcome::Skipped(skip) => report.skipped.push(skip),
        }
    }

    info!(
        "Scanned {} files, modified {} ({} edits, {} skipped)",
        report.files_scanned,
        report.files_modified,
        report.edits_count,
        report.skipped.len()
    );
    report
}

// ============================================================================
// Tests
// ============================================================================
