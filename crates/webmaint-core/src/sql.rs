//! Running SQL files through a remote execution function.
//!
//! The database exposes a helper procedure (by default `exec_sql(query text)`)
//! that runs arbitrary SQL with service privileges. [`execute_sql_file`]
//! reads a file, ships its whole contents as one call and reports the
//! outcome as a boolean; it never returns an error to the caller.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::SupabaseConfig;
use crate::error::{MaintError, MaintResult};
use crate::supabase::SupabaseClient;

/// Something that can execute a SQL script remotely.
pub trait SqlExecutor {
    /// Execute `sql` as a single call and return the function's result.
    fn execute_sql(&self, sql: &str) -> MaintResult<Value>;
}

/// Executes SQL through a PostgREST remote procedure.
#[derive(Debug)]
pub struct RpcSqlExecutor<'a> {
    client: &'a SupabaseClient,
    function: String,
    param: String,
}

impl<'a> RpcSqlExecutor<'a> {
    pub fn new(client: &'a SupabaseClient, function: &str, param: &str) -> Self {
        RpcSqlExecutor {
            client,
            function: function.to_string(),
            param: param.to_string(),
        }
    }

    /// Use the function and parameter names from configuration.
    pub fn from_config(client: &'a SupabaseClient, config: &SupabaseConfig) -> Self {
        RpcSqlExecutor::new(client, &config.sql_function, &config.sql_param)
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl SqlExecutor for RpcSqlExecutor<'_> {
    fn execute_sql(&self, sql: &str) -> MaintResult<Value> {
        let mut params = Map::new();
        params.insert(self.param.clone(), Value::String(sql.to_string()));
        self.client.rpc(&self.function, &Value::Object(params))
    }
}

/// Outcome of running one SQL file.
#[derive(Debug, Clone, Serialize)]
pub struct SqlRunReport {
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read and execute a SQL file, capturing failure in the report.
pub fn run_sql_file<E>(executor: &E, path: &Path) -> SqlRunReport
where
    E: SqlExecutor + ?Sized,
{
    run_with_progress(executor, path, |_| {})
}

/// Like [`run_sql_file`], printing progress and the outcome to `out`.
///
/// The progress line appears only once the file has been read, so a missing
/// file produces just the failure line.
pub fn report_sql_file<E, W>(executor: &E, path: &Path, out: &mut W) -> SqlRunReport
where
    E: SqlExecutor + ?Sized,
    W: Write + ?Sized,
{
    let report = run_with_progress(executor, path, |file| {
        let _ = writeln!(out, "🔄 Executing {}...", file);
    });
    write_report(&report, out);
    report
}

/// Execute a SQL file, printing progress and the outcome to `out`.
///
/// Returns `true` on success. A missing file, a rejected statement or a
/// transport failure all produce `false` and a message.
pub fn execute_sql_file<E, W>(executor: &E, path: &Path, out: &mut W) -> bool
where
    E: SqlExecutor + ?Sized,
    W: Write + ?Sized,
{
    report_sql_file(executor, path, out).success
}

fn run_with_progress<E, F>(executor: &E, path: &Path, mut on_start: F) -> SqlRunReport
where
    E: SqlExecutor + ?Sized,
    F: FnMut(&str),
{
    let file = path.display().to_string();
    let outcome = fs::read_to_string(path)
        .map_err(|e| MaintError::from_read(path, e))
        .and_then(|sql| {
            on_start(&file);
            debug!("executing {} ({} bytes)", file, sql.len());
            executor.execute_sql(&sql)
        });

    match outcome {
        Ok(result) => SqlRunReport {
            file,
            success: true,
            result: Some(result).filter(|v| !v.is_null()),
            error: None,
        },
        Err(err) => {
            warn!("{}: {}", file, err);
            SqlRunReport {
                file,
                success: false,
                result: None,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Print the outcome line for a finished run.
pub fn write_report<W: Write + ?Sized>(report: &SqlRunReport, out: &mut W) {
    let _ = match &report.error {
        None => writeln!(out, "✅ Executed {} successfully", report.file),
        Some(error) => writeln!(out, "❌ Error executing {}: {}", report.file, error),
    };
}

// ============================================================================
// Tests
// ============================================================================
