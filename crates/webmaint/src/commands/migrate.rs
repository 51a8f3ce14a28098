//! Implementation of the migrate command

use std::io::Write;
use std::path::PathBuf;

use webmaint_core::config::MigrationConfig;
use webmaint_core::error::MaintResult;
use webmaint_core::migration::{apply_migration, McpInvocation, MigrationRequest};
use webmaint_core::output::{emit_response, MigrationResponse};

use super::{write_failed, Context};
use crate::cli::OutputFormat;

/// Arguments for the migrate command.
#[derive(Debug, Clone)]
pub struct MigrateArgs {
    pub file: PathBuf,
    pub project_id: String,
    pub name: Option<String>,
    pub program: Option<String>,
    pub server: Option<String>,
    pub timeout: Option<u64>,
    pub dry_run: bool,
    pub format: OutputFormat,
}

impl MigrateArgs {
    fn config(&self, base: &MigrationConfig) -> MigrationConfig {
        let mut config = base.clone();
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// Run the migrate command.
///
/// Text mode relays the tool's stdout and then its stderr. A tool that exits
/// non-zero or times out becomes an error after its output is relayed; in
/// JSON mode that error carries the captured output in its details.
pub fn run_migrate(ctx: &Context, args: &MigrateArgs, out: &mut impl Write) -> MaintResult<()> {
    let config = args.config(&ctx.config.migration);
    let file = ctx.path(&args.file);

    if args.dry_run {
        let request = MigrationRequest::from_file(&args.project_id, args.name.as_deref(), &file)?;
        let invocation = McpInvocation::new(&config, &request)?;
        return match args.format {
            OutputFormat::Json => emit_response(
                &MigrationResponse::planned(&request, &invocation),
                out,
            )
            .map_err(write_failed),
            OutputFormat::Text => {
                writeln!(out, "{}", shell_line(&invocation)).map_err(write_failed)
            }
        };
    }

    let run = apply_migration(&config, &args.project_id, args.name.as_deref(), &file)?;

    if !run.output.success() {
        if args.format == OutputFormat::Text {
            relay(&run.output.stdout, &run.output.stderr, out).map_err(write_failed)?;
        }
        return Err(run.invocation.failure(&run.output));
    }

    match args.format {
        OutputFormat::Json => {
            let response = MigrationResponse::new(&run.request, &run.invocation, run.output);
            emit_response(&response, out).map_err(write_failed)
        }
        OutputFormat::Text => {
            relay(&run.output.stdout, &run.output.stderr, out).map_err(write_failed)
        }
    }
}

fn relay(stdout: &str, stderr: &str, out: &mut impl Write) -> std::io::Result<()> {
    out.write_all(stdout.as_bytes())?;
    out.write_all(stderr.as_bytes())?;
    out.flush()
}

/// Render the invocation as a copy-pasteable shell command.
fn shell_line(invocation: &McpInvocation) -> String {
    std::iter::once(invocation.program().to_string())
        .chain(invocation.args())
        .map(|arg| shell_quote(&arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
