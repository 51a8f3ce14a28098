//! Binary entry point for the webmaint CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Guard browser-only calls under the current directory
//! webmaint guard
//!
//! # Preview the rewrite as a diff
//! webmaint guard --dry-run --format diff
//!
//! # Apply a migration through the MCP client
//! webmaint migrate database/new_categories.sql --project-id itptinhxsylzvfcpxwpl
//!
//! # Fix RLS policies through exec_sql
//! webmaint exec-sql database/fix_categories_rls.sql
//!
//! # Activate every category
//! webmaint categories activate
//! ```

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use webmaint::cli::{CategoriesAction, Cli, Command, GuardFormat, LogLevel, OutputFormat};
use webmaint::commands::{
    run_categories_activate, run_exec_sql, run_guard, run_migrate, Context, ExecSqlArgs,
    GuardArgs, MigrateArgs,
};
use webmaint_core::error::{MaintError, OutputErrorCode};
use webmaint_core::output::{emit_response, ErrorResponse};

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    let json_errors = wants_json(&cli.command);
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            if json_errors {
                // Errors go to stdout as JSON when JSON output was requested
                let response = ErrorResponse::from_error(&err);
                let _ = emit_response(&response, &mut io::stdout());
                let _ = io::stdout().flush();
            } else {
                let _ = io::stdout().flush();
                eprintln!("error: {}", err);
            }
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn wants_json(command: &Command) -> bool {
    match command {
        Command::Guard { format, .. } => *format == GuardFormat::Json,
        Command::Migrate { format, .. } | Command::ExecSql { format, .. } => {
            *format == OutputFormat::Json
        }
        Command::Categories {
            action: CategoriesAction::Activate { format, .. },
        } => *format == OutputFormat::Json,
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), MaintError> {
    let ctx = Context::load(&cli.global)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Guard {
            path,
            dry_run,
            extensions,
            exclude_dirs,
            format,
        } => {
            let args = GuardArgs {
                path,
                dry_run,
                extensions,
                exclude_dirs,
                format,
            };
            run_guard(&ctx, &args, &mut out).map(|_| ())
        }
        Command::Migrate {
            file,
            project_id,
            name,
            program,
            server,
            timeout,
            dry_run,
            format,
        } => {
            let args = MigrateArgs {
                file,
                project_id,
                name,
                program,
                server,
                timeout,
                dry_run,
                format,
            };
            run_migrate(&ctx, &args, &mut out)
        }
        Command::ExecSql {
            files,
            function,
            param,
            fail_fast,
            format,
        } => {
            let args = ExecSqlArgs {
                files,
                function,
                param,
                fail_fast,
                format,
            };
            run_exec_sql(&ctx, &args, &mut out)
        }
        Command::Categories { action } => match action {
            CategoriesAction::Activate { dry_run, format } => {
                run_categories_activate(&ctx, dry_run, format, &mut out).map(|_| ())
            }
        },
    }
}
