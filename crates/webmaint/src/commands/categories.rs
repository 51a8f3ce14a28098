//! Implementation of the categories command

use std::io::{self, Write};

use webmaint_core::categories::{activate_categories, ActivationReport, CategoryStore};
use webmaint_core::error::MaintResult;
use webmaint_core::output::{emit_response, CategoriesResponse};
use webmaint_core::supabase::SupabaseClient;

use super::{write_failed, Context};
use crate::cli::OutputFormat;

/// Run `categories activate` against the configured project.
pub fn run_categories_activate(
    ctx: &Context,
    dry_run: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> MaintResult<ActivationReport> {
    let client = SupabaseClient::from_config(&ctx.config.supabase)?;
    activate_with_store(&client, dry_run, format, out)
}

/// Activate categories through any store and print the result.
pub fn activate_with_store<S>(
    store: &S,
    dry_run: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> MaintResult<ActivationReport>
where
    S: CategoryStore + ?Sized,
{
    let report = activate_categories(store, dry_run)?;
    match format {
        OutputFormat::Json => {
            emit_response(&CategoriesResponse::new(report.clone()), out).map_err(write_failed)?
        }
        OutputFormat::Text => write_summary(&report, out).map_err(write_failed)?,
    }
    Ok(report)
}

fn write_summary(report: &ActivationReport, out: &mut impl Write) -> io::Result<()> {
    if report.total == 0 {
        return writeln!(out, "No categories found.");
    }

    for category in &report.categories {
        let status = if category.active() { "✅" } else { "❌" };
        if category.is_root() {
            writeln!(out, "{} {}", status, category.label())?;
        } else {
            writeln!(out, "{}    ↳ {}", status, category.label())?;
        }
    }

    if report.inactive_before == 0 {
        writeln!(out, "All {} categories are already active.", report.total)
    } else if report.dry_run {
        writeln!(
            out,
            "{} of {} categories are inactive (dry run, nothing changed).",
            report.inactive_before, report.total
        )
    } else {
        writeln!(
            out,
            "Activated {} categories; {} of {} now active.",
            report.activated,
            report.active_count(),
            report.categories.len()
        )
    }
}
