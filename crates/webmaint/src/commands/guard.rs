//! Implementation of the guard command

use std::io::Write;
use std::path::PathBuf;

use webmaint_core::diff::patches_diff;
use webmaint_core::error::{MaintError, MaintResult};
use webmaint_core::guard::{guard_tree, GuardOptions, PatchReport, WriteMode};
use webmaint_core::output::{emit_response, GuardResponse};
use webmaint_core::walk::WalkOptions;

use super::{write_failed, Context};
use crate::cli::GuardFormat;

/// Arguments for the guard command.
#[derive(Debug, Clone, Default)]
pub struct GuardArgs {
    pub path: Option<PathBuf>,
    pub dry_run: bool,
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub format: GuardFormat,
}

impl GuardArgs {
    /// Merge CLI flags over the configured walk options.
    fn options(&self, ctx: &Context) -> GuardOptions {
        let mut walk = WalkOptions::from(&ctx.config.guard);
        if !self.extensions.is_empty() {
            walk.extensions = self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect();
        }
        for dir in &self.exclude_dirs {
            if !walk.exclude_dirs.contains(dir) {
                walk.exclude_dirs.push(dir.clone());
            }
        }
        GuardOptions {
            walk,
            mode: if self.dry_run {
                WriteMode::DryRun
            } else {
                WriteMode::Apply
            },
        }
    }
}

/// Run the guard command.
pub fn run_guard(ctx: &Context, args: &GuardArgs, out: &mut impl Write) -> MaintResult<PatchReport> {
    let root = match &args.path {
        Some(path) => ctx.path(path),
        None => ctx.workspace.clone(),
    };
    if !root.is_dir() {
        return Err(MaintError::invalid_args(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let report = guard_tree(&root, &args.options(ctx));

    match args.format {
        GuardFormat::Json => {
            let response = GuardResponse::new(root.display().to_string(), report.clone());
            emit_response(&response, out).map_err(write_failed)?;
        }
        GuardFormat::Diff => {
            write!(out, "{}", patches_diff(&report.files)).map_err(write_failed)?;
        }
        GuardFormat::Text => write_summary(&report, out).map_err(write_failed)?,
    }

    Ok(report)
}

fn write_summary(report: &PatchReport, out: &mut impl Write) -> std::io::Result<()> {
    for patch in &report.files {
        let verb = if report.dry_run { "would patch" } else { "patched" };
        writeln!(out, "  {} {} ({} edits)", verb, patch.path, patch.edits.len())?;
    }
    for skip in &report.skipped {
        writeln!(out, "  skipped {}: {}", skip.path, skip.reason)?;
    }
    if report.dry_run {
        writeln!(
            out,
            "Would protect {} files against SSR errors.",
            report.files_modified
        )
    } else {
        writeln!(
            out,
            "Protected {} files against SSR errors.",
            report.files_modified
        )
    }
}
